//! Optical depth along rays.
//!
//! Four queries share the same walk over grid segments:
//!
//! | Query                    | Stops                              | Output                        |
//! |--------------------------|------------------------------------|-------------------------------|
//! | `optical_depth`          | end of grid                        | total τ of one material type  |
//! | `set_optical_depths`     | end of grid                        | cumulative τ per path segment |
//! | `set_interaction_point`  | when τ exceeds the target          | interaction cell and distance |
//! | `optical_depth_to`       | at the distance, or when opaque    | [`PathDepth`]                 |
//!
//! When every component has constant cross sections and nothing moves,
//! the per-component extinction cross sections are evaluated once per ray
//! instead of once per segment.

use std::ops::ControlFlow;

use haze_core::{MaterialType, PhotonPacket, Vec3};
use smallvec::SmallVec;

use crate::MediumSystem;

/// Optical depth up to some distance along a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathDepth {
    /// Cumulative optical depth.
    Finite(f64),
    /// Attenuation `exp(-τ)` would underflow the packet luminosity to
    /// below the smallest positive double.
    Opaque,
}

impl PathDepth {
    /// True if the path is opaque.
    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque)
    }

    /// Optical depth, infinite when opaque.
    pub fn tau(&self) -> f64 {
        match *self {
            Self::Finite(tau) => tau,
            Self::Opaque => f64::INFINITY,
        }
    }

    /// Fraction of the luminosity that survives, `exp(-τ)`.
    pub fn attenuation(&self) -> f64 {
        match *self {
            Self::Finite(tau) => (-tau).exp(),
            Self::Opaque => 0.0,
        }
    }
}

type Sections = SmallVec<[f64; 4]>;

impl MediumSystem {
    /// Extinction cross sections per component when the fast path applies.
    fn ray_sections(&self, lambda: f64) -> Option<Sections> {
        self.constant_sections.then(|| {
            (0..self.num_media())
                .map(|h| self.mix(0, h).section_ext(lambda))
                .collect()
        })
    }

    /// Optical depth of segment `ds` in cell `m`, whose far end lies at
    /// cumulative distance `s_exit`.
    fn segment_depth(
        &self,
        sections: Option<&[f64]>,
        pp: &PhotonPacket,
        m: usize,
        ds: f64,
        s_exit: f64,
    ) -> f64 {
        let k = match sections {
            Some(sections) => self.extinction_from_sections(m, sections),
            None => {
                let lambda = self.perceived_wavelength(pp, m, s_exit);
                self.opacity_ext_for(lambda, m, pp)
            }
        };
        k * ds
    }

    /// Total optical depth of the components of type `ty` along the ray
    /// from `position` in `direction`, at wavelength `lambda` and under
    /// default conditions.
    pub fn optical_depth(
        &self,
        position: Vec3,
        direction: Vec3,
        lambda: f64,
        ty: MaterialType,
    ) -> f64 {
        let mut tau = 0.0;
        self.grid.walk(position, direction, &mut |cell, ds| {
            if let Some(m) = cell {
                tau += ds * self.opacity_ext_of(lambda, m, ty);
            }
            ControlFlow::Continue(())
        });
        tau
    }

    /// Tessellate the current ray of `pp` and store the cumulative optical
    /// depth at the exit of every segment.
    ///
    /// Segments outside the grid carry the optical depth accumulated so
    /// far.
    pub fn set_optical_depths(&self, pp: &mut PhotonPacket) {
        self.grid.path(pp.path_mut());
        let mut tau = 0.0;
        if let Some(sections) = self.ray_sections(pp.wavelength()) {
            for segment in pp.path_mut().segments_mut() {
                if let Some(m) = segment.cell {
                    tau += segment.ds * self.extinction_from_sections(m, &sections);
                }
                segment.tau = tau;
            }
            return;
        }
        for i in 0..pp.path().len() {
            let segment = pp.path().segments()[i];
            if let Some(m) = segment.cell {
                tau += self.segment_depth(None, pp, m, segment.ds, segment.s);
            }
            pp.path_mut().segments_mut()[i].tau = tau;
        }
    }

    /// Locate the point along the current ray of `pp` where the cumulative
    /// optical depth reaches `tau_scat`, and record it in the packet.
    ///
    /// The distance is interpolated linearly within the segment where the
    /// target is crossed. Returns `false`, leaving the packet untouched,
    /// when the ray leaves the grid before reaching `tau_scat`.
    pub fn set_interaction_point(&self, pp: &mut PhotonPacket, tau_scat: f64) -> bool {
        let sections = self.ray_sections(pp.wavelength());
        let mut found = None;
        {
            let packet: &PhotonPacket = pp;
            let mut tau = 0.0;
            let mut s = 0.0;
            let sections = sections.as_deref();
            self.grid.walk(packet.position(), packet.direction(), &mut |cell, ds| {
                if let Some(m) = cell {
                    let dtau = self.segment_depth(sections, packet, m, ds, s + ds);
                    if tau + dtau > tau_scat {
                        found = Some((m, s + ds * (tau_scat - tau) / dtau));
                        return ControlFlow::Break(());
                    }
                    tau += dtau;
                }
                s += ds;
                ControlFlow::Continue(())
            });
        }
        match found {
            Some((m, distance)) => {
                pp.set_interaction_point(m, distance);
                true
            }
            None => false,
        }
    }

    /// Optical depth from the current position of `pp` to `distance`
    /// along its ray, for a peel-off packet heading to an observer.
    ///
    /// The walk stops as soon as `exp(-τ)` applied to the packet
    /// luminosity would underflow, returning [`PathDepth::Opaque`].
    /// Segments are taken whole, so the result covers every segment that
    /// starts before `distance`.
    pub fn optical_depth_to(&self, pp: &PhotonPacket, distance: f64) -> PathDepth {
        let tau_max = (pp.luminosity() / f64::MIN_POSITIVE).ln();
        let sections = self.ray_sections(pp.wavelength());
        let mut tau = 0.0;
        let mut s = 0.0;
        let mut opaque = false;
        self.grid.walk(pp.position(), pp.direction(), &mut |cell, ds| {
            if s >= distance {
                return ControlFlow::Break(());
            }
            if let Some(m) = cell {
                tau += self.segment_depth(sections.as_deref(), pp, m, ds, s + ds);
                if tau >= tau_max {
                    opaque = true;
                    return ControlFlow::Break(());
                }
            }
            s += ds;
            ControlFlow::Continue(())
        });
        if opaque {
            PathDepth::Opaque
        } else {
            PathDepth::Finite(tau)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haze_test_utils::{approx_eq, ConstantMix, SlabGrid, UniformMedium};

    use crate::MediumSystemConfig;

    fn slab(k: f64, cells: usize) -> MediumSystem {
        MediumSystem::new(MediumSystemConfig::new(
            SlabGrid::uniform(0.0, 1.0, cells).boxed(),
            vec![UniformMedium::new(ConstantMix::dust(0.5 * k, 0.5 * k).shared(), 1.0).boxed()],
        ))
        .unwrap()
    }

    fn packet_at(x: f64) -> PhotonPacket {
        let mut pp = PhotonPacket::new();
        pp.launch(1e-6, 1.0, Vec3::new(x, 0.0, 0.0), Vec3::x());
        pp
    }

    #[test]
    fn path_depth_attenuation() {
        assert_eq!(PathDepth::Opaque.attenuation(), 0.0);
        assert_eq!(PathDepth::Finite(0.0).attenuation(), 1.0);
        assert!(PathDepth::Opaque.tau().is_infinite());
        assert!(!PathDepth::Finite(3.0).is_opaque());
    }

    #[test]
    fn cumulative_depths_grow_linearly() {
        let sys = slab(2.0, 5);
        let mut pp = packet_at(-1.0);
        sys.set_optical_depths(&mut pp);
        let segments = pp.path().segments();
        assert_eq!(segments.len(), 6);
        assert_eq!(segments[0].cell, None);
        assert_eq!(segments[0].tau, 0.0);
        for (i, segment) in segments[1..].iter().enumerate() {
            assert!(approx_eq(segment.tau, 0.4 * (i + 1) as f64, 1e-12));
        }
    }

    #[test]
    fn interaction_point_closed_form() {
        let sys = slab(2.0, 4);
        let mut pp = packet_at(0.0);
        assert!(sys.set_interaction_point(&mut pp, 1.3));
        assert!(approx_eq(pp.interaction_distance(), 0.65, 1e-12));
        assert_eq!(pp.interaction_cell(), Some(2));
    }

    #[test]
    fn interaction_beyond_grid_fails() {
        let sys = slab(2.0, 4);
        let mut pp = packet_at(0.0);
        assert!(!sys.set_interaction_point(&mut pp, 2.0));
        assert!(!sys.set_interaction_point(&mut pp, 5.0));
        assert_eq!(pp.interaction_cell(), None);
    }

    #[test]
    fn optical_depth_filters_material_type() {
        let sys = slab(3.0, 3);
        assert!(approx_eq(
            sys.optical_depth(Vec3::zeros(), Vec3::x(), 1e-6, MaterialType::Dust),
            3.0,
            1e-12
        ));
        assert_eq!(
            sys.optical_depth(Vec3::zeros(), Vec3::x(), 1e-6, MaterialType::Gas),
            0.0
        );
    }

    #[test]
    fn depth_to_distance_stops_at_distance() {
        let sys = slab(1.0, 4);
        let pp = packet_at(0.0);
        assert!(approx_eq(sys.optical_depth_to(&pp, 0.5).tau(), 0.5, 1e-12));
        assert!(approx_eq(sys.optical_depth_to(&pp, 10.0).tau(), 1.0, 1e-12));
    }

    #[test]
    fn opaque_threshold_scales_with_luminosity() {
        for luminosity in [1.0, 1e10] {
            let tau_max = (luminosity / f64::MIN_POSITIVE).ln();
            let mut pp = packet_at(0.0);
            pp.set_luminosity(luminosity);

            let below = slab(tau_max * (1.0 - 1e-6), 4).optical_depth_to(&pp, 10.0);
            assert!(!below.is_opaque());
            assert!(approx_eq(below.tau(), tau_max * (1.0 - 1e-6), 1e-12));
            assert!(slab(tau_max * (1.0 + 1e-6), 4)
                .optical_depth_to(&pp, 10.0)
                .is_opaque());
        }

        // ln(1 / MIN_POSITIVE) is about 708.4; a brighter packet tolerates more.
        let sys = slab(720.0, 4);
        let mut pp = packet_at(0.0);
        assert!(sys.optical_depth_to(&pp, 10.0).is_opaque());
        pp.set_luminosity(1e10);
        assert!(approx_eq(sys.optical_depth_to(&pp, 10.0).tau(), 720.0, 1e-12));
    }

    #[test]
    fn depth_to_distance_detects_opaque_path() {
        let sys = slab(1000.0, 4);
        let pp = packet_at(0.0);
        assert_eq!(sys.optical_depth_to(&pp, 10.0), PathDepth::Opaque);
        assert_eq!(PathDepth::Opaque.attenuation() * pp.luminosity(), 0.0);
    }
}
