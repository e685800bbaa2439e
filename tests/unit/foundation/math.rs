use super::*;

#[test]
fn power_of_two_excludes_zero() {
    assert!(!is_positive_power_of_two(0));
    assert!(is_positive_power_of_two(1));
    assert!(is_positive_power_of_two(256));
    assert!(!is_positive_power_of_two(96));
}

#[test]
fn unit_remap_clamps_to_endpoints() {
    assert_eq!(unit_remap(5.0, 0.0, 10.0), 0.5);
    assert_eq!(unit_remap(-1.0, 0.0, 10.0), 0.0);
    assert_eq!(unit_remap(11.0, 0.0, 10.0), 1.0);
}

#[test]
fn align_to_rounds_up_to_multiple() {
    assert_eq!(align_to(0, 256), 0);
    assert_eq!(align_to(1, 256), 256);
    assert_eq!(align_to(256, 256), 256);
    assert_eq!(align_to(257, 256), 512);
}
