//! Integration test: setup and radiation merges over a process group.
//!
//! Each "process" is a thread holding one endpoint of a
//! [`ChannelCommunicator`] group. Every rank samples its own chunk of cells
//! and the merged state must match a single-process run exactly, since
//! per-cell sampling streams do not depend on the partition.

use std::sync::Arc;
use std::thread;

use haze_core::{ChannelCommunicator, Communicator, Medium, SingleProcess, Vec3, WavelengthGrid};
use haze_medium::{MediumOptions, MediumSystem, MediumSystemConfig};
use haze_test_utils::{ConstantMix, SlabGrid, UniformMedium};

const CELLS: usize = 13;

fn media() -> Vec<Box<dyn Medium>> {
    let dust = ConstantMix::dust(1.0, 2.0).with_mass(2.0).shared();
    let gas = ConstantMix::new(haze_core::MaterialType::Gas, 0.5, 0.0).shared();
    vec![
        UniformMedium::new(dust, 1.0)
            .with_gradient(5.0)
            .with_velocity(Vec3::new(1e4, 0.0, 0.0))
            .boxed(),
        UniformMedium::new(gas, 3.0)
            .with_gradient(-2.0)
            .with_temperature(120.0)
            .with_magnetic_field(Vec3::new(0.0, 1e-10, 0.0))
            .boxed(),
    ]
}

fn config(communicator: Arc<dyn Communicator>) -> MediumSystemConfig {
    let mut cfg = MediumSystemConfig::new(SlabGrid::uniform(0.0, 1.0, CELLS).boxed(), media());
    cfg.communicator = communicator;
    cfg.radiation_wavelengths = Some(WavelengthGrid::logarithmic(1e-7, 1e-3, 8).unwrap());
    cfg.options = MediumOptions {
        seed: 2024,
        num_density_samples: 50,
        secondary_emission: true,
        ..MediumOptions::default()
    };
    cfg
}

#[test]
fn partitioned_setup_matches_single_process() {
    let reference = MediumSystem::new(config(Arc::new(SingleProcess))).unwrap();

    let systems: Vec<MediumSystem> = thread::scope(|s| {
        let handles: Vec<_> = ChannelCommunicator::group(4)
            .into_iter()
            .map(|comm| s.spawn(move || MediumSystem::new(config(Arc::new(comm))).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for sys in &systems {
        for m in 0..CELLS {
            assert_eq!(sys.cell_state(m), reference.cell_state(m), "cell {m}");
            for h in 0..2 {
                assert_eq!(
                    sys.component_state(m, h),
                    reference.component_state(m, h),
                    "cell {m} component {h}"
                );
            }
        }
    }
}

#[test]
fn radiation_field_merges_every_rank() {
    let totals: Vec<(f64, f64)> = thread::scope(|s| {
        let handles: Vec<_> = ChannelCommunicator::group(3)
            .into_iter()
            .map(|comm| {
                s.spawn(move || {
                    let rank = comm.rank();
                    let mut sys = MediumSystem::new(config(Arc::new(comm))).unwrap();
                    sys.store_radiation_field(true, rank, 2, 1.0);
                    sys.store_radiation_field(false, 7, 4, 0.5);
                    sys.communicate_radiation_field(true).unwrap();
                    sys.communicate_radiation_field(false).unwrap();
                    let rf = sys.radiation_field().unwrap();
                    let primary: f64 = (0..CELLS).map(|m| rf.primary(m, 2)).sum();
                    (primary, rf.secondary(7, 4))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(totals, vec![(3.0, 1.5); 3]);
}
