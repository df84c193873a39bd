//! Placeholder substitution for package metadata files.
//!
//! Templates such as the RPM `.spec` file and the Debian `control` file carry
//! `@UPPER_CASE@` placeholders. A [`MetadataTemplate`] is an explicit, ordered
//! list of replacements; rendering fails if any placeholder survives.

use crate::error::{ReleaseError, Result};

/// A placeholder recognised in package metadata templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    /// `@TOOLS_VERSION@`
    ToolsVersion,
    /// `@TOOLS_RELEASE@`
    ToolsRelease,
    /// `@ARCHITECTURE@`
    Architecture,
}

impl Token {
    /// The placeholder text, including its `@` delimiters.
    #[must_use]
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::ToolsVersion => "@TOOLS_VERSION@",
            Self::ToolsRelease => "@TOOLS_RELEASE@",
            Self::Architecture => "@ARCHITECTURE@",
        }
    }
}

/// An ordered list of token replacements for one template file.
///
/// # Examples
///
/// ```
/// use tools_release::template::{MetadataTemplate, Token};
///
/// let rendered = MetadataTemplate::new("control")
///     .with(Token::ToolsVersion, "100.3.1")
///     .with(Token::Architecture, "amd64")
///     .render("Version: @TOOLS_VERSION@\nArchitecture: @ARCHITECTURE@\n")
///     .expect("all tokens substituted");
/// assert_eq!(rendered, "Version: 100.3.1\nArchitecture: amd64\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTemplate {
    name: String,
    replacements: Vec<(Token, String)>,
}

impl MetadataTemplate {
    /// Start an empty replacement list for the template called `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            replacements: Vec::new(),
        }
    }

    /// Append a replacement.
    #[must_use]
    pub fn with(mut self, token: Token, value: impl Into<String>) -> Self {
        self.replacements.push((token, value.into()));
        self
    }

    /// Replace every occurrence of each token, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Template`] naming the first `@UPPER_CASE@`
    /// token left in the output.
    pub fn render(&self, content: &str) -> Result<String> {
        let rendered = self
            .replacements
            .iter()
            .fold(content.to_owned(), |acc, (token, value)| {
                acc.replace(token.placeholder(), value)
            });
        match find_leftover_token(&rendered) {
            Some(token) => Err(ReleaseError::Template {
                template: self.name.clone(),
                token: token.to_owned(),
            }),
            None => Ok(rendered),
        }
    }
}

/// Find the first `@NAME@` span where `NAME` is non-empty and made of
/// uppercase ASCII letters, digits and underscores.
fn find_leftover_token(text: &str) -> Option<&str> {
    let mut rest = text;
    let mut offset = 0;
    while let Some(start) = rest.find('@') {
        let after = &rest[start + 1..];
        let Some(len) = after.find('@') else {
            return None;
        };
        let name = &after[..len];
        let is_token = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
        if is_token {
            let begin = offset + start;
            return Some(&text[begin..begin + len + 2]);
        }
        offset += start + 1;
        rest = after;
    }
    None
}
