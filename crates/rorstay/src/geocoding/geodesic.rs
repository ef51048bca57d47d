//! Ellipsoidal distance on WGS-84 (Vincenty's inverse formula).

use crate::listings::domain::Coordinates;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;
const METERS_PER_MILE: f64 = 1_609.344;
const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

pub fn distance_miles(origin: &Coordinates, destination: &Coordinates) -> f64 {
    distance_meters(origin, destination) / METERS_PER_MILE
}

/// Falls back to the spherical great-circle distance for nearly antipodal points where
/// the iteration does not converge.
pub fn distance_meters(origin: &Coordinates, destination: &Coordinates) -> f64 {
    vincenty_meters(origin, destination).unwrap_or_else(|| haversine_meters(origin, destination))
}

fn vincenty_meters(origin: &Coordinates, destination: &Coordinates) -> Option<f64> {
    let l = (destination.longitude() - origin.longitude()).to_radians();
    let u1 = ((1.0 - WGS84_F) * origin.latitude().to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * destination.latitude().to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return Some(0.0);
        }

        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial lines have cos_sq_alpha == 0.
        let cos_2sigma_m = if cos_sq_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));

        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if (lambda - previous).abs() < CONVERGENCE {
            let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - WGS84_B.powi(2)) / WGS84_B.powi(2);
            let a = 1.0 + u_sq / 16_384.0 * (4_096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let b = u_sq / 1_024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = b
                * sin_sigma
                * (cos_2sigma_m
                    + b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            return Some(WGS84_B * a * (sigma - delta_sigma));
        }
    }

    None
}

fn haversine_meters(origin: &Coordinates, destination: &Coordinates) -> f64 {
    let lat1 = origin.latitude().to_radians();
    let lat2 = destination.latitude().to_radians();
    let d_lat = lat2 - lat1;
    let d_lng = (destination.longitude() - origin.longitude()).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * MEAN_EARTH_RADIUS_M * h.sqrt().asin()
}
