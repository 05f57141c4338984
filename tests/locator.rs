//! End-to-end locator scenarios: lattice descent, coincident boundaries,
//! rotated fills and tile walks.

use approx::assert_relative_eq;
use transport_for_mc::cell::{Cell, Fill};
use transport_for_mc::geometry::{cross_lattice, distance_to_boundary, find_cell};
use transport_for_mc::lattice::{HexLattice, Lattice, RectLattice};
use transport_for_mc::model::Model;
use transport_for_mc::particle::{Particle, ParticleType};
use transport_for_mc::region::Region;
use transport_for_mc::settings::Settings;
use transport_for_mc::surface::SurfaceKind;

/// Root universe with one box cell holding a 2x2 lattice; every tile is the
/// same pin universe whose single cell spans the whole tile.
fn lattice_model() -> Model {
    let mut model = Model::new(Settings::default());
    let u_root = model.add_universe(0).unwrap();
    let u_pin = model.add_universe(1).unwrap();
    model.set_root_universe(u_root);

    // Root cell: 0 <= x,y <= 2 box (z unbounded)
    let s_x0 = model.add_surface(SurfaceKind::XPlane { x0: 0.0 }, None) as i32;
    let s_x2 = model.add_surface(SurfaceKind::XPlane { x0: 2.0 }, None) as i32;
    let s_y0 = model.add_surface(SurfaceKind::YPlane { y0: 0.0 }, None) as i32;
    let s_y2 = model.add_surface(SurfaceKind::YPlane { y0: 2.0 }, None) as i32;

    // Pin cell: tile-local box matching the 1x1 tile exactly, so the pin
    // surfaces are coincident with the lattice faces.
    let s_px_lo = model.add_surface(SurfaceKind::XPlane { x0: -0.5 }, None) as i32;
    let s_px_hi = model.add_surface(SurfaceKind::XPlane { x0: 0.5 }, None) as i32;
    let s_py_lo = model.add_surface(SurfaceKind::YPlane { y0: -0.5 }, None) as i32;
    let s_py_hi = model.add_surface(SurfaceKind::YPlane { y0: 0.5 }, None) as i32;

    model
        .add_cell(Cell::new(
            100,
            u_pin,
            Region::intersection(vec![s_px_lo, -s_px_hi, s_py_lo, -s_py_hi]),
            Fill::Material {
                materials: vec![Some(0)],
                sqrt_kt: vec![0.0],
            },
        ))
        .unwrap();

    let lat = Lattice::rect(
        1,
        RectLattice {
            shape: [2, 2, 1],
            pitch: [1.0, 1.0, 1.0],
            lower_left: [0.0, 0.0, 0.0],
            is_3d: false,
            universes: vec![Some(u_pin); 4],
        },
    );
    let i_lat = model.add_lattice(lat);

    model
        .add_cell(Cell::new(
            1,
            u_root,
            Region::intersection(vec![s_x0, -s_x2, s_y0, -s_y2]),
            Fill::Lattice { lattice: i_lat },
        ))
        .unwrap();

    model.finalize().unwrap();
    model
}

#[test]
fn test_lattice_descent() {
    let model = lattice_model();
    let mut p = Particle::new([0.5, 0.5, 0.0], [1.0, 0.0, 0.0], 1e6, ParticleType::Neutron);
    assert!(find_cell(&model, &mut p, false));

    // Level 0: root universe, lattice-holding cell. Level 1: the lattice
    // frame, stamped with tile indices and bound to the pin cell.
    assert_eq!(p.n_coord, 2);
    assert_eq!(p.coord[0].universe, Some(0));
    assert_eq!(p.coord[0].cell, Some(model.cell_map[&1]));
    assert_eq!(p.coord[1].lattice, Some(0));
    assert_eq!(p.coord[1].lattice_i, [0, 0, 0]);
    assert_eq!(p.coord[1].universe, Some(1));
    assert_eq!(p.coord[1].cell, Some(model.cell_map[&100]));
    assert_eq!(p.material, Some(0));

    // Tile-local coordinates are centered on the tile.
    assert_relative_eq!(p.coord[1].r[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(p.coord[1].r[1], 0.0, epsilon = 1e-12);

    // A point in the diagonal tile resolves to indices (1,1,0).
    let mut q = Particle::new([1.5, 1.5, 0.0], [1.0, 0.0, 0.0], 1e6, ParticleType::Neutron);
    assert!(find_cell(&model, &mut q, false));
    assert_eq!(q.coord[1].lattice_i, [1, 1, 0]);
}

#[test]
fn test_coincident_pin_surface_yields_lattice_crossing() {
    let model = lattice_model();
    // The pin box surfaces coincide exactly with the lattice tile faces;
    // the crossing must be reported as a lattice translation, not a pin
    // surface crossing, so lattice transport stays in charge.
    let mut p = Particle::new([0.5, 0.5, 0.0], [1.0, 0.0, 0.0], 1e6, ParticleType::Neutron);
    find_cell(&model, &mut p, false);

    let b = distance_to_boundary(&model, &mut p);
    assert_relative_eq!(b.distance, 0.5, epsilon = 1e-12);
    assert_eq!(b.surface_crossed, 0);
    assert_eq!(b.lattice_translation, [1, 0, 0]);
    assert_eq!(b.next_level, 2);
}

#[test]
fn test_cross_lattice_walk() {
    let model = lattice_model();
    let mut p = Particle::new([0.5, 0.5, 0.0], [1.0, 0.0, 0.0], 1e6, ParticleType::Neutron);
    find_cell(&model, &mut p, false);

    let b = distance_to_boundary(&model, &mut p);
    p.advance(b.distance);
    p.surface = 0;
    cross_lattice(&model, &mut p, b.lattice_translation);

    assert!(p.alive);
    assert_eq!(p.coord[1].lattice_i, [1, 0, 0]);
    assert_eq!(p.coord[1].cell, Some(model.cell_map[&100]));
    // Entering the neighbor tile from its left face
    assert_relative_eq!(p.coord[1].r[0], -0.5, epsilon = 1e-12);
}

#[test]
fn test_coincident_root_surface_beats_deeper_lattice_face() {
    let model = lattice_model();
    // At the outer lattice edge the tile face coincides with the root
    // cell's own boundary. The outer level is evaluated first and a deeper
    // candidate must be meaningfully smaller to displace it, so the surface
    // crossing wins and the particle leaves the root cell.
    let mut p = Particle::new([1.5, 0.5, 0.0], [1.0, 0.0, 0.0], 1e6, ParticleType::Neutron);
    find_cell(&model, &mut p, false);
    assert_eq!(p.coord[1].lattice_i, [1, 0, 0]);

    let b = distance_to_boundary(&model, &mut p);
    assert_relative_eq!(b.distance, 0.5, epsilon = 1e-12);
    assert_eq!(b.lattice_translation, [0, 0, 0]);
    // Crossed into the positive half-space of the x = 2 root plane.
    assert_eq!(b.surface_crossed, 2);
    assert_eq!(b.next_level, 1);
}

#[test]
fn test_cross_lattice_off_the_edge_marks_particle_lost() {
    // Root cell wider than the tiled range and no outer universe: crossing
    // past the last tile restarts the search from the base coordinates,
    // which also fails, so the particle is marked lost.
    let mut model = Model::new(Settings::default());
    let u_root = model.add_universe(0).unwrap();
    let u_pin = model.add_universe(1).unwrap();
    model.set_root_universe(u_root);

    let s_x0 = model.add_surface(SurfaceKind::XPlane { x0: 0.0 }, None) as i32;
    let s_x3 = model.add_surface(SurfaceKind::XPlane { x0: 3.0 }, None) as i32;
    let s_y0 = model.add_surface(SurfaceKind::YPlane { y0: 0.0 }, None) as i32;
    let s_y1 = model.add_surface(SurfaceKind::YPlane { y0: 1.0 }, None) as i32;
    let s_px_lo = model.add_surface(SurfaceKind::XPlane { x0: -0.5 }, None) as i32;
    let s_px_hi = model.add_surface(SurfaceKind::XPlane { x0: 0.5 }, None) as i32;

    model
        .add_cell(Cell::new(
            100,
            u_pin,
            Region::intersection(vec![s_px_lo, -s_px_hi]),
            Fill::Material {
                materials: vec![Some(0)],
                sqrt_kt: vec![0.0],
            },
        ))
        .unwrap();

    let lat = Lattice::rect(
        1,
        RectLattice {
            shape: [2, 1, 1],
            pitch: [1.0, 1.0, 1.0],
            lower_left: [0.0, 0.0, 0.0],
            is_3d: false,
            universes: vec![Some(u_pin), Some(u_pin)],
        },
    );
    let i_lat = model.add_lattice(lat);
    model
        .add_cell(Cell::new(
            1,
            u_root,
            Region::intersection(vec![s_x0, -s_x3, s_y0, -s_y1]),
            Fill::Lattice { lattice: i_lat },
        ))
        .unwrap();
    model.finalize().unwrap();

    let mut p = Particle::new([1.5, 0.5, 0.0], [1.0, 0.0, 0.0], 1e6, ParticleType::Neutron);
    find_cell(&model, &mut p, false);
    assert_eq!(p.coord[1].lattice_i, [1, 0, 0]);

    let b = distance_to_boundary(&model, &mut p);
    assert_relative_eq!(b.distance, 0.5, epsilon = 1e-12);
    assert_eq!(b.lattice_translation, [1, 0, 0]);

    p.advance(b.distance);
    p.surface = 0;
    cross_lattice(&model, &mut p, b.lattice_translation);
    assert!(!p.alive);
}

#[test]
fn test_rotated_universe_fill() {
    let mut model = Model::new(Settings::default());
    let u_root = model.add_universe(0).unwrap();
    let u_child = model.add_universe(1).unwrap();
    model.set_root_universe(u_root);

    let s_world = model.add_surface(
        SurfaceKind::Sphere {
            x0: 0.0,
            y0: 0.0,
            z0: 0.0,
            radius: 10.0,
        },
        None,
    ) as i32;

    model
        .add_cell(Cell::new(
            20,
            u_child,
            Region::intersection(vec![-s_world]),
            Fill::Material {
                materials: vec![Some(0)],
                sqrt_kt: vec![0.0],
            },
        ))
        .unwrap();

    // 90 degrees about z, no translation
    let rotation = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
    model
        .add_cell(Cell::new(
            1,
            u_root,
            Region::intersection(vec![-s_world]),
            Fill::Universe {
                universe: u_child,
                translation: [0.0, 0.0, 0.0],
                rotation: Some(rotation),
            },
        ))
        .unwrap();
    model.finalize().unwrap();

    let mut p = Particle::new([1.0, 0.0, 0.0], [1.0, 0.0, 0.0], 1e6, ParticleType::Neutron);
    assert!(find_cell(&model, &mut p, false));

    assert_eq!(p.n_coord, 2);
    assert!(p.coord[1].rotated);
    assert_relative_eq!(p.coord[1].r[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(p.coord[1].r[1], 1.0, epsilon = 1e-12);
    assert_relative_eq!(p.coord[1].r[2], 0.0, epsilon = 1e-12);
    // The direction transforms identically
    assert_relative_eq!(p.coord[1].u[0], 0.0, epsilon = 1e-12);
    assert_relative_eq!(p.coord[1].u[1], 1.0, epsilon = 1e-12);
}

#[test]
fn test_translated_universe_fill() {
    let mut model = Model::new(Settings::default());
    let u_root = model.add_universe(0).unwrap();
    let u_child = model.add_universe(1).unwrap();
    model.set_root_universe(u_root);

    let s_world = model.add_surface(
        SurfaceKind::Sphere {
            x0: 0.0,
            y0: 0.0,
            z0: 0.0,
            radius: 100.0,
        },
        None,
    ) as i32;

    model
        .add_cell(Cell::new(
            20,
            u_child,
            Region::intersection(vec![-s_world]),
            Fill::Material {
                materials: vec![Some(3)],
                sqrt_kt: vec![0.5],
            },
        ))
        .unwrap();
    model
        .add_cell(Cell::new(
            1,
            u_root,
            Region::intersection(vec![-s_world]),
            Fill::Universe {
                universe: u_child,
                translation: [4.0, -1.0, 2.0],
                rotation: None,
            },
        ))
        .unwrap();
    model.finalize().unwrap();

    let mut p = Particle::new([5.0, 0.0, 0.0], [0.0, 1.0, 0.0], 1e6, ParticleType::Neutron);
    assert!(find_cell(&model, &mut p, false));
    assert_eq!(p.n_coord, 2);
    assert!(!p.coord[1].rotated);
    assert_relative_eq!(p.coord[1].r[0], 1.0);
    assert_relative_eq!(p.coord[1].r[1], 1.0);
    assert_relative_eq!(p.coord[1].r[2], -2.0);
    assert_eq!(p.material, Some(3));
    assert_relative_eq!(p.sqrt_kt, 0.5);
}

#[test]
fn test_distribcell_instances_across_tiles() {
    // Same pin universe in two tiles, pin cell with per-instance materials.
    let mut model = Model::new(Settings::default());
    let u_root = model.add_universe(0).unwrap();
    let u_pin = model.add_universe(1).unwrap();
    model.set_root_universe(u_root);

    let s_x0 = model.add_surface(SurfaceKind::XPlane { x0: 0.0 }, None) as i32;
    let s_x2 = model.add_surface(SurfaceKind::XPlane { x0: 2.0 }, None) as i32;
    let s_y0 = model.add_surface(SurfaceKind::YPlane { y0: 0.0 }, None) as i32;
    let s_y1 = model.add_surface(SurfaceKind::YPlane { y0: 1.0 }, None) as i32;
    let s_world = model.add_surface(
        SurfaceKind::Sphere {
            x0: 0.0,
            y0: 0.0,
            z0: 0.0,
            radius: 50.0,
        },
        None,
    ) as i32;

    model
        .add_cell(Cell::new(
            100,
            u_pin,
            Region::intersection(vec![-s_world]),
            Fill::Material {
                materials: vec![Some(5), Some(6)],
                sqrt_kt: vec![0.0],
            },
        ))
        .unwrap();

    let lat = Lattice::rect(
        1,
        RectLattice {
            shape: [2, 1, 1],
            pitch: [1.0, 1.0, 1.0],
            lower_left: [0.0, 0.0, 0.0],
            is_3d: false,
            universes: vec![Some(u_pin), Some(u_pin)],
        },
    );
    let i_lat = model.add_lattice(lat);
    model
        .add_cell(Cell::new(
            1,
            u_root,
            Region::intersection(vec![s_x0, -s_x2, s_y0, -s_y1]),
            Fill::Lattice { lattice: i_lat },
        ))
        .unwrap();
    model.finalize().unwrap();

    let mut p0 = Particle::new([0.5, 0.5, 0.0], [1.0, 0.0, 0.0], 1e6, ParticleType::Neutron);
    assert!(find_cell(&model, &mut p0, false));
    assert_eq!(p0.cell_instance, 0);
    assert_eq!(p0.material, Some(5));

    let mut p1 = Particle::new([1.5, 0.5, 0.0], [1.0, 0.0, 0.0], 1e6, ParticleType::Neutron);
    assert!(find_cell(&model, &mut p1, false));
    assert_eq!(p1.cell_instance, 1);
    assert_eq!(p1.material, Some(6));
}

#[test]
fn test_hex_lattice_descent_and_crossing() {
    let mut model = Model::new(Settings::default());
    let u_root = model.add_universe(0).unwrap();
    let u_pin = model.add_universe(1).unwrap();
    model.set_root_universe(u_root);

    let s_world = model.add_surface(
        SurfaceKind::Sphere {
            x0: 0.0,
            y0: 0.0,
            z0: 0.0,
            radius: 50.0,
        },
        None,
    ) as i32;

    model
        .add_cell(Cell::new(
            100,
            u_pin,
            Region::intersection(vec![-s_world]),
            Fill::Material {
                materials: vec![Some(0)],
                sqrt_kt: vec![0.0],
            },
        ))
        .unwrap();

    // Two-ring hex, all seven tiles the same pin universe.
    let side = 3usize;
    let mut universes = vec![None; side * side];
    for ia in 0..side {
        for ix in 0..side {
            if ix + ia > 0 && ix + ia < 4 {
                universes[side * ia + ix] = Some(u_pin);
            }
        }
    }
    let lat = Lattice::hex(
        2,
        HexLattice {
            n_rings: 2,
            n_axial: 1,
            center: [0.0, 0.0, 0.0],
            pitch: [1.0, 1.0],
            is_3d: false,
            universes,
        },
    );
    let i_lat = model.add_lattice(lat);
    model
        .add_cell(Cell::new(
            1,
            u_root,
            Region::intersection(vec![-s_world]),
            Fill::Lattice { lattice: i_lat },
        ))
        .unwrap();
    model.finalize().unwrap();

    // Start in the central tile heading +y toward the flat face.
    let mut p = Particle::new([0.0, 0.1, 0.0], [0.0, 1.0, 0.0], 1e6, ParticleType::Neutron);
    assert!(find_cell(&model, &mut p, false));
    assert_eq!(p.coord[1].lattice_i, [1, 1, 0]);

    let b = distance_to_boundary(&model, &mut p);
    assert_relative_eq!(b.distance, 0.4, epsilon = 1e-10);
    assert_eq!(b.surface_crossed, 0);
    assert_eq!(b.lattice_translation, [0, 1, 0]);

    p.advance(b.distance);
    p.surface = 0;
    cross_lattice(&model, &mut p, b.lattice_translation);
    assert!(p.alive);
    assert_eq!(p.coord[1].lattice_i, [1, 2, 0]);
    // Entered through the neighbor's lower flat face
    assert_relative_eq!(p.coord[1].r[1], -0.5, epsilon = 1e-10);
}
