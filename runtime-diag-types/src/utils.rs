use std::hash::Hasher;

/// Feeds a float into a hasher so that values comparing equal hash equally.
///
/// `0.0 == -0.0` holds for floats, so both are hashed as positive zero.
pub(crate) fn hash_f64<H: Hasher>(value: f64, state: &mut H) {
    let value = if value == 0.0 { 0.0 } else { value };
    state.write_u64(value.to_bits());
}

#[cfg(test)]
pub(crate) fn hash_of<T: std::hash::Hash>(value: &T) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::Hash;

    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}
