//! Signature-based request screening
//!
//! Every string value a request carries is matched against an ordered table
//! of case-insensitive signatures. All SQL-injection signatures are tried
//! across all values before any XSS signature; the first hit blocks the
//! request. These are heuristics: they will reject some legitimate text
//! (a product description containing `--`) and miss obfuscated payloads.

use std::fmt;

use regex::{Regex, RegexBuilder};

/// Family a signature belongs to, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThreatCategory {
    SqlInjection,
    CrossSiteScripting,
}

impl ThreatCategory {
    pub const ORDER: [ThreatCategory; 2] = [
        ThreatCategory::SqlInjection,
        ThreatCategory::CrossSiteScripting,
    ];

    /// Reason recorded in the incident log
    pub fn incident_reason(&self) -> &'static str {
        match self {
            ThreatCategory::SqlInjection => "SQL Injection attempt detected",
            ThreatCategory::CrossSiteScripting => "XSS attack attempt detected",
        }
    }

    /// Message returned to the client
    pub fn block_message(&self) -> &'static str {
        match self {
            ThreatCategory::SqlInjection => "Potential SQL injection detected",
            ThreatCategory::CrossSiteScripting => "Potential XSS attack detected",
        }
    }
}

/// Where in the request a value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputLocation {
    Query(String),
    Form(String),
    JsonBody,
}

impl fmt::Display for InputLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputLocation::Query(key) => write!(f, "query param '{}'", key),
            InputLocation::Form(key) => write!(f, "form field '{}'", key),
            InputLocation::JsonBody => f.write_str("JSON body"),
        }
    }
}

/// A request-carried string value
#[derive(Debug, Clone)]
pub struct RequestInput {
    pub location: InputLocation,
    pub value: String,
}

impl RequestInput {
    pub fn query(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            location: InputLocation::Query(key.into()),
            value: value.into(),
        }
    }

    pub fn form(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            location: InputLocation::Form(key.into()),
            value: value.into(),
        }
    }

    pub fn json_body(value: impl Into<String>) -> Self {
        Self {
            location: InputLocation::JsonBody,
            value: value.into(),
        }
    }
}

/// One compiled signature
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: &'static str,
    pub category: ThreatCategory,
    pattern: Regex,
}

impl Signature {
    pub fn new(
        name: &'static str,
        category: ThreatCategory,
        pattern: &str,
    ) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            name,
            category,
            pattern,
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }
}

/// Result of screening a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked {
        category: ThreatCategory,
        signature: &'static str,
        location: InputLocation,
    },
}

impl Verdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked { .. })
    }
}

const DEFAULT_SIGNATURES: &[(&str, ThreatCategory, &str)] = &[
    (
        "sql_statement_keyword",
        ThreatCategory::SqlInjection,
        r"(\s|^)(SELECT|INSERT|UPDATE|DELETE|DROP|ALTER)\s",
    ),
    (
        "sql_union_select",
        ThreatCategory::SqlInjection,
        r"(\s|^)(UNION|JOIN|OR|AND)\s+SELECT",
    ),
    ("sql_line_comment", ThreatCategory::SqlInjection, r"--"),
    ("sql_block_comment", ThreatCategory::SqlInjection, r"/\*.*\*/"),
    ("sql_statement_terminator", ThreatCategory::SqlInjection, r";.*\n?$"),
    ("xss_script_tag", ThreatCategory::CrossSiteScripting, r"<script.*?>"),
    ("xss_javascript_uri", ThreatCategory::CrossSiteScripting, r"javascript:"),
    ("xss_event_handler", ThreatCategory::CrossSiteScripting, r"on\w+\s*="),
    ("xss_iframe", ThreatCategory::CrossSiteScripting, r"<iframe"),
    ("xss_img_onerror", ThreatCategory::CrossSiteScripting, r"<img.*?onerror"),
];

/// Ordered signature table
#[derive(Debug, Clone)]
pub struct PatternScreener {
    signatures: Vec<Signature>,
}

impl PatternScreener {
    pub fn new(signatures: Vec<Signature>) -> Self {
        Self { signatures }
    }

    /// The built-in SQL-injection and XSS signatures
    pub fn with_default_signatures() -> Result<Self, regex::Error> {
        let signatures = DEFAULT_SIGNATURES
            .iter()
            .map(|(name, category, pattern)| Signature::new(name, *category, pattern))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(signatures))
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// First signature of `category` matching `value`
    pub fn first_match(&self, category: ThreatCategory, value: &str) -> Option<&Signature> {
        self.signatures
            .iter()
            .filter(|s| s.category == category)
            .find(|s| s.matches(value))
    }

    /// Screen every input, one category at a time
    pub fn screen(&self, inputs: &[RequestInput]) -> Verdict {
        for category in ThreatCategory::ORDER {
            for input in inputs {
                if let Some(signature) = self.first_match(category, &input.value) {
                    tracing::warn!(
                        target: "security",
                        signature = signature.name,
                        location = %input.location,
                        "{} pattern detected",
                        category.block_message()
                    );
                    return Verdict::Blocked {
                        category,
                        signature: signature.name,
                        location: input.location.clone(),
                    };
                }
            }
        }
        Verdict::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screener() -> PatternScreener {
        PatternScreener::with_default_signatures().unwrap()
    }

    fn screen_value(value: &str) -> Verdict {
        screener().screen(&[RequestInput::query("q", value)])
    }

    fn category_of(verdict: Verdict) -> Option<ThreatCategory> {
        match verdict {
            Verdict::Blocked { category, .. } => Some(category),
            Verdict::Allowed => None,
        }
    }

    #[test]
    fn test_sql_payloads_are_blocked() {
        for payload in [
            "1; DROP TABLE users",
            "SELECT * FROM users",
            "x' UNION SELECT password FROM users",
            "admin'--",
            "1 /* comment */ = 1",
            "name OR SELECT 1",
            "drop table products",
        ] {
            assert_eq!(
                category_of(screen_value(payload)),
                Some(ThreatCategory::SqlInjection),
                "{payload}"
            );
        }
    }

    #[test]
    fn test_xss_payloads_are_blocked() {
        for payload in [
            "<script>alert(1)</script>",
            "<SCRIPT src=x>",
            "javascript:alert(1)",
            "<div onclick = 'x'>",
            "<iframe src=evil>",
            "<img src=x onerror=alert(1)>",
        ] {
            assert_eq!(
                category_of(screen_value(payload)),
                Some(ThreatCategory::CrossSiteScripting),
                "{payload}"
            );
        }
    }

    #[test]
    fn test_clean_values_are_allowed() {
        for value in ["blue mug", "Organic soya milk 1L", "alice@example.com", "Str0ng!Pass"] {
            assert_eq!(screen_value(value), Verdict::Allowed, "{value}");
        }
        assert_eq!(screener().screen(&[]), Verdict::Allowed);
    }

    #[test]
    fn test_statement_terminator_ignores_trailing_newline() {
        let screener = screener();
        for body in ["{\"q\": \"a;b\"}", "{\"q\": \"a;b\"}\n", "x;\r\n"] {
            let verdict = screener.screen(&[RequestInput::json_body(body)]);
            match verdict {
                Verdict::Blocked { signature, .. } => {
                    assert_eq!(signature, "sql_statement_terminator", "{body:?}")
                }
                Verdict::Allowed => panic!("{body:?} was allowed"),
            }
        }
    }

    #[test]
    fn test_false_positive_is_accepted() {
        assert!(screen_value("Best mug -- now on sale").is_blocked());
    }

    #[test]
    fn test_sql_checked_before_xss_across_all_inputs() {
        let verdict = screener().screen(&[
            RequestInput::query("a", "<script>"),
            RequestInput::form("b", "1; DROP TABLE users"),
        ]);

        match verdict {
            Verdict::Blocked {
                category, location, ..
            } => {
                assert_eq!(category, ThreatCategory::SqlInjection);
                assert_eq!(location, InputLocation::Form("b".to_string()));
            }
            Verdict::Allowed => panic!("expected block"),
        }
    }

    #[test]
    fn test_both_categories_report_sql() {
        let verdict = screen_value("<script>x</script>; DROP TABLE users");
        assert_eq!(category_of(verdict), Some(ThreatCategory::SqlInjection));
    }

    #[test]
    fn test_signatures_are_individually_addressable() {
        let screener = screener();
        let sig = screener
            .signatures()
            .iter()
            .find(|s| s.name == "xss_javascript_uri")
            .unwrap();
        assert!(sig.matches("JavaScript:void(0)"));
        assert!(!sig.matches("java script"));
    }

    #[test]
    fn test_custom_table() {
        let screener = PatternScreener::new(vec![Signature::new(
            "vbscript_uri",
            ThreatCategory::CrossSiteScripting,
            r"vbscript:",
        )
        .unwrap()]);
        assert!(screener
            .screen(&[RequestInput::json_body("VBScript:msgbox")])
            .is_blocked());
        // Default signatures are not part of a custom table
        assert!(!screener
            .screen(&[RequestInput::json_body("<script>")])
            .is_blocked());
    }
}
