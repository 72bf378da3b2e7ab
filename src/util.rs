/// Up to two leading letters of the label's first words, for bubbles drawn
/// without their photo.
pub fn initials(label: &str) -> String {
    let words = label.split_whitespace().collect::<Vec<_>>();
    match words.as_slice() {
        [] => String::new(),
        [single] => single.chars().take(2).collect(),
        [first, second, ..] => first.chars().take(1).chain(second.chars().take(1)).collect(),
    }
}

/// Formats a share in `0.0..=1.0` as a percentage; larger weights are printed as-is.
pub fn format_weight(weight: f64) -> String {
    if (0.0..=1.0).contains(&weight) {
        format!("{:.1}%", weight * 100.0)
    } else {
        format!("{weight:.2}")
    }
}
