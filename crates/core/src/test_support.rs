//! Record builders shared by unit tests.

use crate::blob::Matrix;
use crate::colmap::{Camera, Geometry, Image, ImageRecord, PairRecord, PosePrior};

/// An image whose camera id equals its image id. `seed` drives the
/// keypoint and descriptor contents so distinct seeds give distinct bytes.
pub fn image_record(id: i64, name: &str, seed: u8) -> ImageRecord {
    ImageRecord {
        image: Image {
            image_id: id,
            name: name.to_string(),
            camera_id: id,
            prior: PosePrior {
                qw: Some(1.0),
                tz: Some(seed as f64),
                ..PosePrior::default()
            },
        },
        camera: Camera {
            camera_id: id,
            model: 2,
            width: 640,
            height: 480,
            params: Some(vec![500.0, 320.0, 240.0, 0.01]),
            prior_focal_length: 0,
        },
        keypoints: Matrix::new(
            3,
            4,
            (0..12).map(|i| i as f32 * 0.5 + seed as f32).collect(),
        )
        .unwrap(),
        descriptors: Matrix::new(3, 8, (0..24u8).map(|i| i.wrapping_mul(seed)).collect())
            .unwrap(),
    }
}

/// A pair with `n` identity correspondences and an identity homography.
pub fn pair_record(id1: i64, id2: i64, n: u32) -> PairRecord {
    let corr: Vec<u32> = (0..n).flat_map(|i| [i, i]).collect();
    let identity = Matrix::new(3, 3, vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
    PairRecord {
        id1,
        id2,
        matches: Matrix::new(n as usize, 2, corr.clone()).unwrap(),
        geometry: Geometry {
            inliers: Matrix::new(n as usize, 2, corr).unwrap(),
            config: 2,
            f: None,
            e: None,
            h: Some(identity),
        },
    }
}
