//! Logo asset lookup for AMS system names.

const LOGOS: &[(&[&str], &str)] = &[
    (&["afc", "box turtle", "box_turtle", "boxturtle"], "A:assets/images/ams/box_turtle_64.png"),
    (&["happy hare", "happy_hare", "happyhare", "ercf"], "A:assets/images/ams/ercf_64.png"),
    (&["3ms"], "A:assets/images/ams/3ms_64.png"),
    (&["tradrack"], "A:assets/images/ams/tradrack_64.png"),
    (&["mmx"], "A:assets/images/ams/mmx_64.png"),
    (&["night owl", "night_owl", "nightowl"], "A:assets/images/ams/night_owl_64.png"),
    (&["quattro box", "quattro_box", "quattrobox"], "A:assets/images/ams/quattro_box_64.png"),
    (&["btt vivid", "btt_vivid", "bttvivid", "vivid"], "A:assets/images/ams/btt_vivid_64.png"),
    (&["kms"], "A:assets/images/ams/kms_64.png"),
];

/// Logo for a system or unit name such as "Box Turtle 2" or
/// "Happy Hare (Mock)". Matching ignores case, a parenthesized suffix and
/// a trailing unit number.
pub fn logo_for_system(type_name: &str) -> Option<&'static str> {
    let lower = type_name.to_lowercase();
    let base = lower.split(" (").next().unwrap_or_default().trim_end();
    let key = base.trim_end_matches(|c: char| c.is_ascii_digit()).trim_end();

    LOGOS
        .iter()
        .find(|(names, _)| names.contains(&key))
        .map(|(_, path)| *path)
}
