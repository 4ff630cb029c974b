use ndarray::{Array1, Array2, Axis};
use s1browse::core::{composite, normalize, ClipPreset, ClipRanges};

#[test]
fn test_normalize_golden_sequence() {
    let input: Array1<f64> = (0..10).map(f64::from).collect();
    let golden = vec![0u8, 75, 115, 145, 169, 191, 210, 227, 244, 255];
    assert_eq!(normalize(&input, None, None).to_vec(), golden);

    let mut with_nan: Vec<f64> = input.to_vec();
    with_nan.push(f64::NAN);
    let mut golden_nan = golden.clone();
    golden_nan.push(0);
    assert_eq!(normalize(&Array1::from(with_nan), None, None).to_vec(), golden_nan);
}

#[test]
fn test_normalize_keeps_shape() {
    let band = Array2::from_shape_fn((7, 3), |(r, c)| (r * 3 + c) as f32 * 0.01);
    let output = normalize(&band, Some(0.0), Some(0.15));
    assert_eq!(output.dim(), (7, 3));
}

#[test]
fn test_nan_always_zero_for_every_preset() {
    let band = Array2::from_shape_fn((10, 10), |(r, c)| {
        if (r + c) % 3 == 0 {
            f32::NAN
        } else {
            (r as f32 - 4.0) * (c as f32) * 0.01
        }
    });

    for preset in [ClipPreset::Standard, ClipPreset::Gibs] {
        let ranges = preset.ranges();
        for range in [ranges.co_pol, ranges.cross_pol] {
            let output = normalize(&band, Some(range.vmin), Some(range.vmax));
            for ((r, c), value) in output.indexed_iter() {
                if band[[r, c]].is_nan() {
                    assert_eq!(*value, 0, "NaN at ({}, {}) should map to 0", r, c);
                }
            }
        }
    }
}

#[test]
fn test_normalize_monotonic() {
    let band: Array1<f32> = (0..200).map(|i| i as f32 * 0.001).collect();
    let output = normalize(&band, Some(0.02), Some(0.3));
    for pair in output.to_vec().windows(2) {
        assert!(pair[0] <= pair[1]);
    }
    assert_eq!(output[0], 0);
}

#[test]
fn test_composite_fixture() {
    let co = ndarray::array![[0.0f32, 0.0], [0.075, 0.15], [f32::NAN, f32::NAN]];
    let cross = ndarray::array![[f32::NAN, f32::NAN], [0.0125f32, 0.025], [0.0, 0.0]];

    let output = composite(co.view(), cross.view(), &ClipRanges::default()).unwrap();
    assert_eq!(output.dim(), (3, 2, 4));
    assert_eq!(output.index_axis(Axis(2), 0), ndarray::array![[0u8, 0], [180, 255], [0, 0]]);
    assert_eq!(output.index_axis(Axis(2), 1), ndarray::array![[0u8, 0], [180, 255], [0, 0]]);
    assert_eq!(output.index_axis(Axis(2), 2), output.index_axis(Axis(2), 0));
    assert_eq!(output.index_axis(Axis(2), 3), ndarray::array![[0u8, 0], [255, 255], [0, 0]]);
}

#[test]
fn test_composite_mask_requires_both_bands() {
    let co = Array2::from_shape_fn((5, 5), |(r, _)| if r == 0 { f32::NAN } else { 0.05 });
    let cross = Array2::from_shape_fn((5, 5), |(_, c)| if c == 4 { f32::NAN } else { 0.01 });

    let output = composite(co.view(), cross.view(), &ClipPreset::Gibs.ranges()).unwrap();
    let mask = output.index_axis(Axis(2), 3);
    for ((r, c), value) in mask.indexed_iter() {
        let expected = if r == 0 || c == 4 { 0 } else { 255 };
        assert_eq!(*value, expected);
    }
}
