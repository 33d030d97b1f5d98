use bytemuck::{cast_slice, pod_collect_to_vec};

/// Native-endian bytes of `values`.
pub(crate) fn floats_to_bytes(values: &[f32]) -> Vec<u8> {
    cast_slice::<f32, u8>(values).to_vec()
}

/// Inverse of [`floats_to_bytes`]. `bytes` need not be aligned.
#[track_caller]
pub(crate) fn bytes_to_floats(bytes: &[u8]) -> Vec<f32> {
    assert!(
        bytes.len() % size_of::<f32>() == 0,
        "{} bytes is not a whole number of f32 values",
        bytes.len(),
    );
    pod_collect_to_vec::<u8, f32>(bytes)
}

#[cfg(test)]
#[track_caller]
pub(crate) fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (&a, &e)) in std::iter::zip(actual, expected).enumerate() {
        assert!(
            (a - e).abs() <= tolerance,
            "index {i}: {a} differs from {e} by more than {tolerance}"
        );
    }
}
