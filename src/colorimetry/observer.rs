use super::resample::spline_to_1nm;
use crate::common::WavelengthTable;

const FIRST_WAVELENGTH: u32 = 360;
const TABLE_PITCH: u32 = 5;

/// CIE 1931 2° standard observer, x̄ ȳ z̄ at 5 nm from 360 to 830 nm.
#[rustfmt::skip]
const CIE_1931_2DEG: [[f64; 3]; 95] = [
    [0.000129900, 0.000003917, 0.000606100], // 360
    [0.000232100, 0.000006965, 0.001086000], // 365
    [0.000414900, 0.000012390, 0.001946000], // 370
    [0.000741600, 0.000022020, 0.003486000], // 375
    [0.001368000, 0.000039000, 0.006450001], // 380
    [0.002236000, 0.000064000, 0.010549990], // 385
    [0.004243000, 0.000120000, 0.020050010], // 390
    [0.007650000, 0.000217000, 0.036210000], // 395
    [0.014310000, 0.000396000, 0.067850010], // 400
    [0.023190000, 0.000640000, 0.110200000], // 405
    [0.043510000, 0.001210000, 0.207400000], // 410
    [0.077630000, 0.002180000, 0.371300000], // 415
    [0.134380000, 0.004000000, 0.645600000], // 420
    [0.214770000, 0.007300000, 1.039050100], // 425
    [0.283900000, 0.011600000, 1.385600000], // 430
    [0.328500000, 0.016840000, 1.622960000], // 435
    [0.348280000, 0.023000000, 1.747060000], // 440
    [0.348060000, 0.029800000, 1.782600000], // 445
    [0.336200000, 0.038000000, 1.772110000], // 450
    [0.318700000, 0.048000000, 1.744100000], // 455
    [0.290800000, 0.060000000, 1.669200000], // 460
    [0.251100000, 0.073900000, 1.528100000], // 465
    [0.195360000, 0.090980000, 1.287640000], // 470
    [0.142100000, 0.112600000, 1.041900000], // 475
    [0.095640000, 0.139020000, 0.812950100], // 480
    [0.057950010, 0.169300000, 0.616200000], // 485
    [0.032010000, 0.208020000, 0.465180000], // 490
    [0.014700000, 0.258600000, 0.353300000], // 495
    [0.004900000, 0.323000000, 0.272000000], // 500
    [0.002400000, 0.407300000, 0.212300000], // 505
    [0.009300000, 0.503000000, 0.158200000], // 510
    [0.029100000, 0.608200000, 0.111700000], // 515
    [0.063270000, 0.710000000, 0.078249990], // 520
    [0.109600000, 0.793200000, 0.057250010], // 525
    [0.165500000, 0.862000000, 0.042160000], // 530
    [0.225749900, 0.914850100, 0.029840000], // 535
    [0.290400000, 0.954000000, 0.020300000], // 540
    [0.359700000, 0.980300000, 0.013400000], // 545
    [0.433449900, 0.994950100, 0.008749999], // 550
    [0.512050100, 1.000000000, 0.005749999], // 555
    [0.594500000, 0.995000000, 0.003900000], // 560
    [0.678400000, 0.978600000, 0.002749999], // 565
    [0.762100000, 0.952000000, 0.002100000], // 570
    [0.842500000, 0.915400000, 0.001800000], // 575
    [0.916300000, 0.870000000, 0.001650001], // 580
    [0.978600000, 0.816300000, 0.001400000], // 585
    [1.026300000, 0.757000000, 0.001100000], // 590
    [1.056700000, 0.694900000, 0.001000000], // 595
    [1.062200000, 0.631000000, 0.000800000], // 600
    [1.045600000, 0.566800000, 0.000600000], // 605
    [1.002600000, 0.503000000, 0.000340000], // 610
    [0.938400000, 0.441200000, 0.000240000], // 615
    [0.854449900, 0.381000000, 0.000190000], // 620
    [0.751400000, 0.321000000, 0.000100000], // 625
    [0.642400000, 0.265000000, 0.000049999], // 630
    [0.541900000, 0.217000000, 0.000030000], // 635
    [0.447900000, 0.175000000, 0.000020000], // 640
    [0.360800000, 0.138200000, 0.000010000], // 645
    [0.283500000, 0.107000000, 0.000000000], // 650
    [0.218700000, 0.081600000, 0.000000000], // 655
    [0.164900000, 0.061000000, 0.000000000], // 660
    [0.121200000, 0.044580000, 0.000000000], // 665
    [0.087400000, 0.032000000, 0.000000000], // 670
    [0.063600000, 0.023200000, 0.000000000], // 675
    [0.046770000, 0.017000000, 0.000000000], // 680
    [0.032900000, 0.011920000, 0.000000000], // 685
    [0.022700000, 0.008210000, 0.000000000], // 690
    [0.015840000, 0.005723000, 0.000000000], // 695
    [0.011359160, 0.004102000, 0.000000000], // 700
    [0.008110916, 0.002929000, 0.000000000], // 705
    [0.005790346, 0.002091000, 0.000000000], // 710
    [0.004109457, 0.001484000, 0.000000000], // 715
    [0.002899327, 0.001047000, 0.000000000], // 720
    [0.002049190, 0.000740000, 0.000000000], // 725
    [0.001439971, 0.000520000, 0.000000000], // 730
    [0.000999949, 0.000361100, 0.000000000], // 735
    [0.000690079, 0.000249200, 0.000000000], // 740
    [0.000476021, 0.000171900, 0.000000000], // 745
    [0.000332301, 0.000120000, 0.000000000], // 750
    [0.000234826, 0.000084800, 0.000000000], // 755
    [0.000166151, 0.000060000, 0.000000000], // 760
    [0.000117413, 0.000042400, 0.000000000], // 765
    [0.000083075, 0.000030000, 0.000000000], // 770
    [0.000058707, 0.000021200, 0.000000000], // 775
    [0.000041510, 0.000014990, 0.000000000], // 780
    [0.000029353, 0.000010600, 0.000000000], // 785
    [0.000020674, 0.000007465, 0.000000000], // 790
    [0.000014560, 0.000005257, 0.000000000], // 795
    [0.000010254, 0.000003702, 0.000000000], // 800
    [0.000007222, 0.000002607, 0.000000000], // 805
    [0.000005086, 0.000001836, 0.000000000], // 810
    [0.000003582, 0.000001293, 0.000000000], // 815
    [0.000002523, 0.000000911, 0.000000000], // 820
    [0.000001777, 0.000000641, 0.000000000], // 825
    [0.000001251, 0.000000451, 0.000000000], // 830
];

lazy_static::lazy_static! {
    /// The 2° observer splined to 1 nm, 360 to 830 nm.
    pub static ref CIE_1931: ObserverTable = ObserverTable::cie_1931();
}

/// Color-matching functions on a 1 nm grid.
#[derive(Debug, Clone)]
pub struct ObserverTable {
    first: u32,
    cmf: Vec<na::Vector3<f64>>,
}

impl ObserverTable {
    fn cie_1931() -> Self {
        // each color-matching function is splined through its own 5 nm knots
        let column = |c: usize| {
            let values = CIE_1931_2DEG.iter().map(|r| r[c]).collect::<Vec<_>>();
            spline_to_1nm(&values, TABLE_PITCH)
        };
        let (x, y, z) = (column(0), column(1), column(2));

        Self {
            first: FIRST_WAVELENGTH,
            cmf: x
                .iter()
                .zip(&y)
                .zip(&z)
                .map(|((x, y), z)| na::Vector3::new(*x, *y, *z))
                .collect(),
        }
    }

    /// (x̄, ȳ, z̄) at `wavelength` nm.
    pub fn at(&self, wavelength: u32) -> Option<&na::Vector3<f64>> {
        self.index_of(wavelength).map(|i| &self.cmf[i])
    }
}

impl WavelengthTable for ObserverTable {
    fn first_wavelength(&self) -> u32 {
        self.first
    }

    fn len(&self) -> usize {
        self.cmf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_observer_covers_visible_range() {
        assert_eq!(CIE_1931.first_wavelength(), 360);
        assert_eq!(CIE_1931.last_wavelength(), Some(830));
        assert_eq!(CIE_1931.len(), 471);
        assert!(CIE_1931.at(359).is_none());
        assert!(CIE_1931.at(831).is_none());
    }

    #[test]
    fn test_observer_tabulated_points() {
        let peak = CIE_1931.at(555).unwrap();
        assert_relative_eq!(peak.y, 1.0);
        assert_relative_eq!(peak.x, 0.5120501);

        let blue = CIE_1931.at(445).unwrap();
        assert_relative_eq!(blue.z, 1.7826);

        let between = CIE_1931.at(557).unwrap();
        assert!(between.y < 1.0 && between.y > 0.995);
    }

    #[test]
    fn test_observer_follows_curvature_between_knots() {
        // ȳ is concave around its peak, so it must sit above the 555/560 nm chord (0.998)
        let y = CIE_1931.at(557).unwrap().y;
        assert!(y > 0.998 && y < 1.0);

        assert!((360..=830).all(|nm| {
            let v = CIE_1931.at(nm).unwrap();
            v.x >= 0.0 && v.y >= 0.0 && v.z >= 0.0
        }));
    }
}
