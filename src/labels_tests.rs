use super::*;

#[test]
fn suffix_has_expected_length_and_alphabet() {
    let suffix = generate_suffix();
    assert_eq!(suffix.len(), SUFFIX_LEN);
    assert!(suffix
        .bytes()
        .all(|b| SUFFIX_ALPHABET.contains(&b)));
}

#[test]
fn suffixes_are_not_trivially_constant() {
    let a = generate_suffix();
    let b = generate_suffix();
    // Not a strict guarantee, but with 30^5 possibilities a collision across
    // two samples would indicate a broken RNG, not bad luck.
    assert_ne!(a, b);
}

#[test]
fn child_name_concatenates_parts() {
    assert_eq!(child_name("my-xr", "x7k2q", "db"), "my-xr-x7k2q-db");
}

#[test]
fn child_name_truncates_to_dns_label_limit() {
    let long_template = "a".repeat(80);
    let name = child_name("xr", "abcde", &long_template);
    assert!(name.len() <= 63);
    assert!(!name.ends_with('-'));
}
