//! Keyword subset enumeration.
//!
//! `combinations` is the core generator: every proper, non-empty subset of the
//! input, in ascending bitmask order, where bit `j` set means token `j` is left
//! out. The full set (mask 0) and the empty set (mask `2^n - 1`) are never
//! produced; callers that need them add them explicitly, which
//! `exhaustive_subsets` and `with_empty` do.
use tracing::warn;

pub fn combinations<T: Clone>(tokens: &[T]) -> Vec<Vec<T>> {
    let count = tokens.len();
    if count == 0 {
        return Vec::new();
    }
    if count >= usize::BITS as usize {
        warn!(count, "keyword list too long to enumerate; skipping combinations");
        return Vec::new();
    }

    let all_excluded = (1usize << count) - 1;
    (1..all_excluded)
        .map(|mask| {
            tokens
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) == 0)
                .map(|(_, token)| token.clone())
                .collect()
        })
        .collect()
}

/// The full list followed by every proper non-empty subset. An empty input
/// yields a single empty combination.
pub fn exhaustive_subsets<T: Clone>(tokens: &[T]) -> Vec<Vec<T>> {
    if tokens.is_empty() {
        return vec![Vec::new()];
    }
    let mut subsets = Vec::with_capacity(combinations_len(tokens.len()) + 1);
    subsets.push(tokens.to_vec());
    subsets.extend(combinations(tokens));
    subsets
}

/// `exhaustive_subsets` with the empty combination appended once.
pub fn with_empty<T: Clone>(tokens: &[T]) -> Vec<Vec<T>> {
    let mut subsets = exhaustive_subsets(tokens);
    if !tokens.is_empty() {
        subsets.push(Vec::new());
    }
    subsets
}

fn combinations_len(count: usize) -> usize {
    match count {
        0 => 0,
        n if n >= usize::BITS as usize => 0,
        n => (1usize << n) - 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_tokens_yield_six_subsets_in_mask_order() {
        let result = combinations(&["a", "b", "c"]);
        assert_eq!(
            result,
            vec![
                vec!["b", "c"],
                vec!["a", "c"],
                vec!["c"],
                vec!["a", "b"],
                vec!["b"],
                vec!["a"],
            ]
        );
        assert!(!result.contains(&vec!["a", "b", "c"]));
        assert!(!result.contains(&Vec::new()));
    }

    #[test]
    fn output_is_deterministic() {
        let tokens = ["x", "y", "z", "w"];
        let first = combinations(&tokens);
        assert_eq!(first, combinations(&tokens));
        assert_eq!(first.len(), (1 << tokens.len()) - 2);
    }

    #[test]
    fn subsets_preserve_input_order() {
        for subset in combinations(&[1, 2, 3, 4, 5]) {
            assert!(subset.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[test]
    fn single_and_empty_inputs_have_no_proper_subsets() {
        assert!(combinations(&["only"]).is_empty());
        assert!(combinations::<&str>(&[]).is_empty());
    }

    #[test]
    fn exhaustive_subsets_lead_with_full_list() {
        let result = exhaustive_subsets(&["a", "b"]);
        assert_eq!(result, vec![vec!["a", "b"], vec!["b"], vec!["a"]]);
        assert_eq!(exhaustive_subsets(&["a"]), vec![vec!["a"]]);
        assert_eq!(exhaustive_subsets::<&str>(&[]), vec![Vec::<&str>::new()]);
    }

    #[test]
    fn with_empty_appends_empty_once() {
        assert_eq!(with_empty(&["g"]), vec![vec!["g"], vec![]]);
        assert_eq!(with_empty::<&str>(&[]), vec![Vec::<&str>::new()]);
        assert_eq!(with_empty(&["a", "b", "c"]).len(), 8);
    }
}
