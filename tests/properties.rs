//! Property-based tests for flags, annotations and rendering.
//!
//! These tests use proptest to generate random inputs and verify
//! that core invariants hold.

use firstboot::flags::REGISTRY;
use firstboot::model::{Command, Package};
use firstboot::{Config, Error, Flag, FlagSet, OsRelease, RenderOptions, render};
use proptest::prelude::*;

/// Any registered flag.
fn flag_strategy() -> impl Strategy<Value = Flag> {
    (0..REGISTRY.len()).prop_map(|i| REGISTRY[i].1)
}

fn flags_strategy(max: usize) -> impl Strategy<Value = Vec<Flag>> {
    prop::collection::vec(flag_strategy(), 0..max)
}

/// A lowercase word that is not a registered spelling.
fn unknown_spelling_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{2,12}".prop_filter("must not be registered", |s| Flag::resolve(s).is_none())
}

fn package_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,15}"
}

fn photon3() -> OsRelease {
    OsRelease::parse("ID=photon\nVERSION_ID=3.0\n")
}

proptest! {
    // ========================================================================
    // Flag applicability
    // ========================================================================

    #[test]
    fn applies_iff_required_is_subset(
        active in flags_strategy(8),
        required in flags_strategy(4),
    ) {
        let set: FlagSet = active.iter().copied().collect();
        let expected = required.iter().all(|f| active.contains(f));
        prop_assert_eq!(set.satisfies(&required), expected);

        let cmd = Command::with_flags("true", required.clone());
        prop_assert_eq!(cmd.applies_to(&set), expected);
    }

    #[test]
    fn empty_requirement_always_applies(active in flags_strategy(8)) {
        let set: FlagSet = active.into_iter().collect();
        prop_assert!(set.satisfies(&[]));
    }

    #[test]
    fn adding_flags_never_unapplies(
        active in flags_strategy(6),
        extra in flags_strategy(6),
        required in flags_strategy(3),
    ) {
        let before: FlagSet = active.iter().copied().collect();
        let mut after = before.clone();
        after.extend(extra);
        prop_assert!(after.is_superset(&before));
        if before.satisfies(&required) {
            prop_assert!(after.satisfies(&required));
        }
    }

    // ========================================================================
    // Spelling resolution
    // ========================================================================

    #[test]
    fn every_spelling_round_trips(flag in flag_strategy()) {
        prop_assert_eq!(Flag::resolve(flag.as_str()), Some(flag));
        prop_assert_eq!(flag.as_str().parse::<Flag>().ok(), Some(flag));
    }

    #[test]
    fn unknown_spelling_fails_whole_list(
        known in flags_strategy(4),
        unknown in unknown_spelling_strategy(),
        position in 0usize..5,
    ) {
        let mut words: Vec<String> = known.iter().map(|f| f.to_string()).collect();
        let at = position.min(words.len());
        words.insert(at, unknown.clone());

        match Flag::parse_list(&words.join(" ")) {
            Err(Error::UnknownFlag { spelling }) => prop_assert_eq!(spelling, unknown),
            other => prop_assert!(false, "expected UnknownFlag, got {:?}", other),
        }
    }

    // ========================================================================
    // Package sigils
    // ========================================================================

    #[test]
    fn sigils_strip_in_any_order(
        name in package_name_strategy(),
        sigils in prop::collection::vec(prop_oneof![Just('!'), Just('=')], 0..4),
    ) {
        let prefix: String = sigils.iter().collect();
        let pkg = Package::parse(&format!("{prefix}{name}")).unwrap();
        prop_assert_eq!(&pkg.name, &name);
        prop_assert_eq!(pkg.uninstall, sigils.contains(&'!'));
        prop_assert_eq!(pkg.mark, sigils.contains(&'='));
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    #[test]
    fn render_is_idempotent(
        packages in prop::collection::vec(package_name_strategy(), 0..6),
        commands in prop::collection::vec("echo [a-z]{1,8}", 0..4),
    ) {
        let cfg = Config {
            packages: packages.iter().map(Package::new).collect(),
            commands: commands.iter().map(Command::new).collect(),
            ..Default::default()
        };
        let opts = RenderOptions { name: Some("prop".into()), ..Default::default() };

        let a = render(cfg.clone(), &photon3(), &opts).unwrap();
        let b = render(cfg, &photon3(), &opts).unwrap();
        prop_assert_eq!(a.to_script(), b.to_script());
        prop_assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn rendered_flags_contain_platform_flags(extra in flags_strategy(4)) {
        let opts = RenderOptions {
            name: Some("prop".into()),
            tags: extra.clone(),
            ..Default::default()
        };
        let rendered = render(Config::default(), &photon3(), &opts).unwrap();
        prop_assert!(rendered.context.has(Flag::Photon));
        prop_assert!(rendered.context.has(Flag::Photon3));
        for flag in extra {
            prop_assert!(rendered.context.has(flag));
        }
    }
}
