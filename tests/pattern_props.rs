//! Property tests for template matching.

use proptest::prelude::*;
use serde_json::Value;
use waymark::PathPattern;

#[derive(Clone, Debug)]
enum Part {
    Literal(String),
    Param(String),
}

fn parts() -> impl Strategy<Value = Vec<Part>> {
    prop::collection::vec(
        prop_oneof![
            "[a-z]{1,6}".prop_map(Part::Literal),
            "[a-z0-9]{1,6}".prop_map(Part::Param),
        ],
        0..6,
    )
}

/// A template for `parts`, params named `p0`, `p1`, … plus a path that
/// instantiates it.
fn instantiate(parts: &[Part]) -> (String, String) {
    let mut template = String::new();
    let mut path = String::new();
    for (i, part) in parts.iter().enumerate() {
        match part {
            Part::Literal(text) => {
                template.push_str(&format!("/{text}"));
                path.push_str(&format!("/{text}"));
            }
            Part::Param(value) => {
                template.push_str(&format!("/{{p{i}}}"));
                path.push_str(&format!("/{value}"));
            }
        }
    }
    if template.is_empty() {
        template.push('/');
        path.push('/');
    }
    (template, path)
}

proptest! {
    #[test]
    fn instantiated_paths_match_exactly(parts in parts()) {
        let (template, path) = instantiate(&parts);
        let pattern = PathPattern::compile(&template).unwrap();

        let m = pattern.match_exact(&path);
        prop_assert!(m.is_some(), "{template} should match {path}");
        let m = m.unwrap();

        for (i, part) in parts.iter().enumerate() {
            if let Part::Param(value) = part {
                prop_assert_eq!(&m.params[&format!("p{i}")], &Value::from(value.as_str()));
            }
        }
    }

    #[test]
    fn prefix_match_ends_on_a_segment_boundary(parts in parts(), tail in "(/[a-z0-9]{0,4}){0,3}") {
        let (template, path) = instantiate(&parts);
        let pattern = PathPattern::compile(&template).unwrap();
        let input = format!("{}{tail}", path.trim_end_matches('/'));

        if let Some(m) = pattern.match_prefix(&input) {
            prop_assert!(input.starts_with(m.consumed));
            let rest = &input[m.consumed.len()..];
            prop_assert!(rest.is_empty() || rest.starts_with('/'));
        }
    }

    #[test]
    fn wildcard_captures_the_remainder(prefix in "[a-z]{1,6}", rest in "[a-z0-9]{1,4}(/[a-z0-9]{1,4}){0,3}") {
        let pattern = PathPattern::compile(&format!("/{prefix}/*")).unwrap();
        let path = format!("/{prefix}/{rest}");

        let m = pattern.match_exact(&path).unwrap();
        prop_assert_eq!(m.consumed, path.as_str());
        prop_assert_eq!(&m.params["*"], &Value::from(rest.as_str()));
    }

    #[test]
    fn extra_text_in_a_segment_never_matches(parts in parts(), junk in "[a-z]{1,3}") {
        prop_assume!(matches!(parts.last(), Some(Part::Literal(_))));
        let (template, path) = instantiate(&parts);
        let pattern = PathPattern::compile(&template).unwrap();

        let input = format!("{path}{junk}");
        prop_assert!(pattern.match_exact(&input).is_none());
    }
}
