use std::fmt::Write;

// ─── Label canonicalization ──────────────────────────────────────

/// Canonical, order-independent string form of a label set.
///
/// Label names are sorted lexicographically and rendered as
/// `{name1="value1",name2="value2"}`. Two label sets carrying the same
/// name/value pairs produce an identical key no matter how the caller
/// ordered them — the key, not the raw pairs, is what a family stores
/// series under.
///
/// An empty label set produces the empty string, NOT `{}`, so an
/// unlabelled series renders as `name value` with no brace block.
pub fn label_key(labels: &[(&str, &str)]) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let mut pairs: Vec<(&str, &str)> = labels.to_vec();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut out = String::with_capacity(pairs.len() * 16 + 2);
    out.push('{');
    for (i, (name, value)) in pairs.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{name}=\"{value}\"");
    }
    out.push('}');
    out
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_set_is_empty_string() {
        assert_eq!(label_key(&[]), "");
    }

    #[test]
    fn single_label() {
        assert_eq!(label_key(&[("status", "200")]), r#"{status="200"}"#);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = label_key(&[
            ("method", "POST"),
            ("endpoint", "/api/user"),
            ("status", "200"),
        ]);
        let b = label_key(&[
            ("status", "200"),
            ("endpoint", "/api/user"),
            ("method", "POST"),
        ]);
        assert_eq!(a, b);
        assert_eq!(
            a,
            r#"{endpoint="/api/user",method="POST",status="200"}"#
        );
    }

    #[test]
    fn names_sorted_lexicographically() {
        let key = label_key(&[("z", "1"), ("a", "2"), ("m", "3")]);
        assert_eq!(key, r#"{a="2",m="3",z="1"}"#);
    }

    #[test]
    fn distinct_values_give_distinct_keys() {
        let a = label_key(&[("status", "200")]);
        let b = label_key(&[("status", "500")]);
        assert_ne!(a, b);
    }
}
