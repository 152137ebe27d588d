//! Tab completion filtering.

/// Candidates starting with `current`, ignoring case, sorted.
pub fn possible_completions<I, S>(current: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let prefix = current.to_lowercase();
    let mut matches: Vec<String> = candidates
        .into_iter()
        .map(Into::into)
        .filter(|candidate| candidate.to_lowercase().starts_with(&prefix))
        .collect();
    matches.sort_by_key(|candidate| candidate.to_lowercase());
    matches
}
