// Integration tests for the navigation state machine:
//   country reset from any reachable state, effect ordering, notice lifecycle

use geo::{polygon, MultiPolygon};
use geonav::{
    error::LoadCause,
    geom::BoundingBox,
    nav::{NavEffect, VisibleLayer},
    Level, NavigationState, Navigator, RegionLoadError, Region, SubRegion,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const REGIONS: [&str; 4] = ["01", "13", "69", "75"];

fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
    MultiPolygon(vec![polygon![(x: x, y: y), (x: x + size, y: y), (x: x + size, y: y + size), (x: x, y: y + size)]])
}

fn region(code: &str) -> Region { Region::new(code, code, square(2.0, 45.0, 1.0)) }

fn commune(code: &str, parent: &str) -> SubRegion { SubRegion::new(code, code, parent, square(2.0, 45.0, 0.1)) }

/// Apply one random transition. Sub-region picks may target the wrong region on purpose.
fn step(nav: &mut Navigator, rng: &mut StdRng) {
    let code = REGIONS[rng.random_range(0..REGIONS.len())];
    match rng.random_range(0..6) {
        0 => { nav.navigate_to_region(region(code)); }
        1 => {
            let parent = nav.state().region_code().unwrap_or(code).to_string();
            let parent = if rng.random_bool(0.8) { parent } else { code.to_string() };
            let _ = nav.navigate_to_sub_region(commune(&format!("{parent}{:03}", rng.random_range(1..50)), &parent));
        }
        2 => { nav.load_succeeded(code); }
        3 => { nav.load_failed(&RegionLoadError::new(code, LoadCause::Missing(code.into()))); }
        4 => nav.set_hovered_label(Some(format!("hover {code}"))),
        _ => { nav.navigate_to_country(); }
    }
}

#[test]
fn country_resets_from_any_sequence() {
    let home = BoundingBox::new(-5.0, 41.0, 10.0, 51.0);
    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut nav = Navigator::default();
        nav.set_home(Some(home));
        for _ in 0..rng.random_range(1..30) { step(&mut nav, &mut rng) }

        let effects = nav.navigate_to_country();
        assert_eq!(nav.state(), &NavigationState::default(), "seed {seed}");
        assert_eq!(nav.state().visible_layer(), VisibleLayer::Regions);
        assert!(nav.awaiting().is_none());
        assert!(nav.notice().is_none());
        assert_eq!(effects, vec![NavEffect::CancelLoad, NavEffect::FitBounds { bbox: home }]);
    }
}

#[test]
fn sub_region_level_always_has_matching_region() {
    for seed in 0..200 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut nav = Navigator::default();
        for _ in 0..40 {
            step(&mut nav, &mut rng);
            let state = nav.state();
            match state.level {
                Level::Country => assert!(state.selected_region.is_none() && state.selected_sub_region.is_none()),
                Level::Region => assert!(state.selected_region.is_some() && state.selected_sub_region.is_none()),
                Level::SubRegion => {
                    let sub = state.selected_sub_region.as_ref().expect("sub-region selected");
                    assert_eq!(Some(&*sub.parent_region_code), state.region_code(), "seed {seed}");
                }
            }
        }
    }
}

#[test]
fn every_drill_in_fits_before_loading() {
    let mut nav = Navigator::new(0.1);
    for code in REGIONS {
        let effects = nav.navigate_to_region(region(code));
        let fit = effects.iter().position(|e| matches!(e, NavEffect::FitBounds { .. }));
        let load = effects.iter().position(|e| matches!(e, NavEffect::LoadSubRegions { .. }));
        assert!(fit.is_some() && fit < load);

        let NavEffect::FitBounds { bbox } = effects[0] else { unreachable!() };
        assert!(bbox.width() > 1.0 && bbox.height() > 1.0);
    }
}

#[test]
fn failure_after_country_is_ignored() {
    let mut nav = Navigator::default();
    nav.navigate_to_region(region("75"));
    nav.navigate_to_country();

    let effects = nav.load_failed(&RegionLoadError::new("75", LoadCause::Missing("75".into())));
    assert!(effects.is_empty());
    assert!(nav.notice().is_none());
    assert_eq!(nav.level(), Level::Country);
}

#[test]
fn failed_first_drill_in_returns_home() {
    let home = BoundingBox::new(-5.0, 41.0, 10.0, 51.0);
    let mut nav = Navigator::default();
    nav.set_home(Some(home));
    nav.set_hovered_label(Some("Rhône".into()));
    nav.navigate_to_region(region("69"));

    let effects = nav.load_failed(&RegionLoadError::new("69", LoadCause::Parse("bad".into())));
    assert_eq!(effects, vec![NavEffect::FitBounds { bbox: home }]);
    assert_eq!(nav.level(), Level::Country);
    assert!(nav.state().selected_region.is_none());
    assert_eq!(nav.state().hovered_label.as_deref(), Some("Rhône"));
    assert!(nav.notice().is_some_and(|n| n.parent_code == "69" && n.message.contains("69")));
}
