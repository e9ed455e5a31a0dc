//! Public type-name extraction from source blobs.
//!
//! The harness names workspace files after the public top-level type each
//! blob declares; a blob with no such declaration is rejected before any
//! compilation is attempted.

use regex::Regex;
use std::sync::OnceLock;

fn type_decl() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?m)^\s*public\s+(?:final\s+|abstract\s+)?(?:class|interface|enum|record)\s+([A-Za-z_$][A-Za-z0-9_$]*)",
        )
        .unwrap()
    })
}

/// First public top-level type name declared in `source`, if any.
pub fn public_type_name(source: &str) -> Option<String> {
    type_decl()
        .captures(source)
        .map(|captures| captures[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_plain_class() {
        let source = "public class Main {\n    public static void main(String[] args) {}\n}\n";
        assert_eq!(public_type_name(source), Some("Main".to_string()));
    }

    #[test]
    fn finds_class_after_imports() {
        let source = "import java.util.List;\n\npublic final class Calculator {}\n";
        assert_eq!(public_type_name(source), Some("Calculator".to_string()));
    }

    #[test]
    fn finds_test_class_with_annotations() {
        let source = "import org.junit.jupiter.api.Test;\n\npublic class CalculatorTest {\n    @Test\n    void adds() {}\n}\n";
        assert_eq!(public_type_name(source), Some("CalculatorTest".to_string()));
    }

    #[test]
    fn rejects_sources_without_public_type() {
        assert_eq!(public_type_name("class Hidden {}"), None);
        assert_eq!(public_type_name("int x = 3;"), None);
        assert_eq!(public_type_name(""), None);
    }

    #[test]
    fn generic_parameters_do_not_leak_into_the_name() {
        let source = "public class Pair<K, V> {}";
        assert_eq!(public_type_name(source), Some("Pair".to_string()));
    }
}
