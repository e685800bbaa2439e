use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        TilefieldError::invalid_argument("x")
            .to_string()
            .contains("invalid argument:")
    );
    assert!(TilefieldError::render("x").to_string().contains("render error:"));
    assert!(TilefieldError::gpu("x").to_string().contains("gpu error:"));
    assert!(
        TilefieldError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(TilefieldError::QueueFull(3).to_string().contains("3 jobs"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = TilefieldError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn soft_assert_passes_and_fails_without_panicking() {
    assert!(soft_assert(true, "op", "never shown").is_ok());

    let err = soft_assert(false, "build_nnf", "resolution must be a power of two").unwrap_err();
    assert!(matches!(err, TilefieldError::InvalidArgument(_)));
    assert!(err.to_string().contains("build_nnf"));
}
