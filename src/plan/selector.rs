//! Step id selectors.
//!
//! Step ids are either 2-segment (`facet:task`) or 3-segment
//! (`actor:facet:task`, for steps bound to a concrete actor). A selector
//! matches segment-wise, `*` wildcarding one segment; a 2-segment selector
//! matches against the `facet:task` tail of either id shape, while a
//! 3-segment selector must match the full id.

/// Whether `selector` selects the step with id `step_id`.
pub fn matches_step_id_selector(selector: &str, step_id: &str) -> bool {
    if selector == "*" {
        return true;
    }

    let sel: Vec<&str> = selector.split(':').collect();
    let id: Vec<&str> = step_id.split(':').collect();

    let seg = |pattern: &str, segment: &str| pattern == "*" || pattern == segment;

    match sel.len() {
        2 => {
            if id.len() < 2 {
                return false;
            }
            let tail = &id[id.len() - 2..];
            seg(sel[0], tail[0]) && seg(sel[1], tail[1])
        }
        3 => id.len() == 3 && sel.iter().zip(id.iter()).all(|(p, s)| seg(p, s)),
        _ => false,
    }
}
