//! Conventional method-handler names.

/// Well-known method names a route can define handlers for.
///
/// Method-handlers are keyed by lower-cased name, so any string works;
/// this enum only spells out the usual HTTP verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET method
    Get,
    /// HEAD method
    Head,
    /// POST method
    Post,
    /// PUT method
    Put,
    /// PATCH method
    Patch,
    /// DELETE method
    Delete,
    /// OPTIONS method
    Options,
}

impl Method {
    /// Returns the handler key for this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Head => "head",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Options => "options",
        }
    }
}

impl AsRef<str> for Method {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizes a method name into its registry key.
pub(crate) fn method_key(name: &str) -> String {
    name.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_lowercase() {
        assert_eq!(method_key("POST"), "post");
        assert_eq!(method_key(Method::Head.as_ref()), "head");
        assert_eq!(Method::Patch.to_string(), "patch");
    }
}
