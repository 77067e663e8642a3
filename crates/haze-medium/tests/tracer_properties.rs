//! Property tests for optical depth along rays through homogeneous and
//! graded slabs.

use haze_core::{MaterialType, PhotonPacket, Vec3};
use haze_medium::{MediumOptions, MediumSystem, MediumSystemConfig, PathDepth};
use haze_test_utils::{approx_eq, ConstantMix, PowerLawMix, SlabGrid, UniformMedium};
use proptest::prelude::*;

fn homogeneous(k: f64, length: f64, cells: usize) -> MediumSystem {
    MediumSystem::new(MediumSystemConfig::new(
        SlabGrid::uniform(0.0, length, cells).boxed(),
        vec![UniformMedium::new(ConstantMix::dust(0.25 * k, 0.75 * k).shared(), 1.0).boxed()],
    ))
    .unwrap()
}

fn graded(cells: usize) -> MediumSystem {
    let mut cfg = MediumSystemConfig::new(
        SlabGrid::uniform(0.0, 1.0, cells).boxed(),
        vec![
            UniformMedium::new(ConstantMix::dust(1.0, 1.0).shared(), 0.5)
                .with_gradient(3.0)
                .boxed(),
            UniformMedium::new(
                ConstantMix::new(MaterialType::Electrons, 0.0, 0.5).shared(),
                2.0,
            )
            .boxed(),
        ],
    );
    cfg.options.seed = 11;
    MediumSystem::new(cfg).unwrap()
}

fn packet(x: f64, direction: Vec3) -> PhotonPacket {
    let mut pp = PhotonPacket::new();
    pp.launch(1e-6, 1.0, Vec3::new(x, 0.0, 0.0), direction);
    pp
}

proptest! {
    #[test]
    fn interaction_distance_is_tau_over_k(
        k in 0.1f64..10.0,
        length in 0.5f64..5.0,
        cells in 1usize..20,
        fraction in 0.0f64..0.999,
    ) {
        let sys = homogeneous(k, length, cells);
        let tau_scat = fraction * k * length;
        let mut pp = packet(0.0, Vec3::x());
        prop_assert!(sys.set_interaction_point(&mut pp, tau_scat));
        prop_assert!(approx_eq(pp.interaction_distance(), tau_scat / k, 1e-9));
        let cell = pp.interaction_cell().unwrap();
        let x = pp.interaction_position().x;
        let width = length / cells as f64;
        prop_assert!(x >= cell as f64 * width - 1e-9 && x <= (cell + 1) as f64 * width + 1e-9);
    }

    #[test]
    fn interaction_beyond_total_depth_fails(
        k in 0.1f64..10.0,
        cells in 1usize..20,
        excess in 1.0f64..3.0,
    ) {
        let sys = homogeneous(k, 1.0, cells);
        let mut pp = packet(0.0, Vec3::x());
        prop_assert!(!sys.set_interaction_point(&mut pp, excess * k * 1.000001));
        prop_assert_eq!(pp.interaction_cell(), None);
    }

    #[test]
    fn cumulative_depth_is_monotone_and_matches_total(
        cells in 1usize..40,
        x in -0.5f64..0.9,
        backward in any::<bool>(),
    ) {
        let sys = graded(cells);
        let direction = if backward { -Vec3::x() } else { Vec3::x() };
        let mut pp = packet(x, direction);
        sys.set_optical_depths(&mut pp);

        let segments = pp.path().segments();
        let mut previous = 0.0;
        for segment in segments {
            prop_assert!(segment.tau >= previous);
            previous = segment.tau;
        }

        let start = Vec3::new(x, 0.0, 0.0);
        let total = sys.optical_depth(start, direction, 1e-6, MaterialType::Dust)
            + sys.optical_depth(start, direction, 1e-6, MaterialType::Electrons);
        prop_assert!(approx_eq(pp.path().total_optical_depth(), total, 1e-10));
    }
}

#[test]
fn interaction_point_agrees_with_cumulative_depths() {
    let sys = graded(16);
    let mut pp = packet(-0.25, Vec3::x());
    sys.set_optical_depths(&mut pp);
    let total = pp.path().total_optical_depth();

    for fraction in [0.1, 0.37, 0.5, 0.91] {
        let tau_scat = fraction * total;
        let mut search = packet(-0.25, Vec3::x());
        assert!(sys.set_interaction_point(&mut search, tau_scat));
        let m = search.interaction_cell().unwrap();
        let segment = pp
            .path()
            .segments()
            .iter()
            .find(|s| s.cell == Some(m))
            .unwrap();
        let entry_tau = segment.tau - segment.ds * sys.opacity_ext(1e-6, m);
        assert!(tau_scat >= entry_tau - 1e-12 && tau_scat <= segment.tau + 1e-12);
    }
}

#[test]
fn opaque_peel_off_path_is_reported() {
    let sys = homogeneous(2000.0, 1.0, 8);
    let pp = packet(0.0, Vec3::x());
    let depth = sys.optical_depth_to(&pp, 2.0);
    assert_eq!(depth, PathDepth::Opaque);
    assert_eq!(depth.attenuation(), 0.0);

    let thin = homogeneous(1.0, 1.0, 8);
    match thin.optical_depth_to(&pp, 2.0) {
        PathDepth::Finite(tau) => assert!(approx_eq(tau, 1.0, 1e-12)),
        PathDepth::Opaque => panic!("thin slab reported opaque"),
    }
}

#[test]
fn hubble_expansion_lowers_power_law_opacity() {
    let mix = PowerLawMix::dust(1e-20, 0.5, 1e-6, 2.0).shared();
    let build = |rate: f64| {
        let mut cfg = MediumSystemConfig::new(
            SlabGrid::uniform(0.0, 1.0e20, 10).boxed(),
            vec![UniformMedium::new(mix.clone(), 1.0).boxed()],
        );
        cfg.options = MediumOptions {
            hubble_expansion_rate: rate,
            ..MediumOptions::default()
        };
        MediumSystem::new(cfg).unwrap()
    };
    let still = build(0.0);
    let expanding = build(1e-14);

    let mut a = packet(0.0, Vec3::x());
    let mut b = packet(0.0, Vec3::x());
    still.set_optical_depths(&mut a);
    expanding.set_optical_depths(&mut b);
    assert!(approx_eq(a.path().total_optical_depth(), 1.0, 1e-9));
    assert!(b.path().total_optical_depth() < a.path().total_optical_depth());
}
