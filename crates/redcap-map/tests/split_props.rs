//! Property tests for top-level splitting.

use proptest::prelude::*;

use redcap_map::{check_balance, split_top_level};

fn atom() -> impl Strategy<Value = String> {
    "[a-z_]{1,8}"
}

/// Balanced argument text built from atoms and nested call forms.
fn argument() -> impl Strategy<Value = String> {
    atom().prop_recursive(3, 24, 4, |inner| {
        (
            prop::sample::select(vec!["SET_", "SRCH", "__IF", "LIST", "GLOB", "MULT"]),
            prop::collection::vec(inner, 1..4),
        )
            .prop_map(|(prefix, args)| format!("{prefix}({})", args.join(", ")))
    })
}

fn strip_separators(text: &str) -> String {
    text.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect()
}

proptest! {
    #[test]
    fn splits_exactly_at_top_level_commas(args in prop::collection::vec(argument(), 1..6)) {
        let joined = args.join(", ");
        prop_assert_eq!(split_top_level(&joined), args);
    }

    #[test]
    fn preserves_content_modulo_separators(args in prop::collection::vec(argument(), 1..6)) {
        let joined = args.join(" ,  ");
        let parts = split_top_level(&joined);
        prop_assert_eq!(strip_separators(&parts.concat()), strip_separators(&joined));
    }

    #[test]
    fn generated_arguments_are_balanced(arg in argument()) {
        prop_assert!(check_balance(&arg).is_ok());
        prop_assert_eq!(split_top_level(&arg).len(), 1);
    }
}
