use std::collections::BTreeMap;

use pfr_core::classifier::{classify, is_valid_semver, ForgeVersion, GitRef, ModuleKind};
use pfr_core::document::{ArgValue, ModuleArgs};

fn opts(pairs: &[(&str, ArgValue)]) -> ModuleArgs {
    ModuleArgs::Options(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn s(v: &str) -> ArgValue {
    ArgValue::Str(v.to_string())
}

#[test]
fn semver_validation() {
    assert!(is_valid_semver("1.2.3"));
    assert!(!is_valid_semver("1.2"));
    assert!(!is_valid_semver("1.2.3-01"));
    assert!(is_valid_semver("1.2.3-alpha.1+build.5"));
    assert!(!is_valid_semver("01.2.3"));
    assert!(!is_valid_semver(" 1.2.3"));
}

#[test]
fn forge_without_version() {
    assert_eq!(
        classify("puppetlabs/stdlib", &ModuleArgs::None),
        ModuleKind::Forge {
            version: ForgeVersion::Any
        }
    );
}

#[test]
fn forge_with_latest() {
    assert_eq!(
        classify(
            "puppetlabs-stdlib",
            &ModuleArgs::Version(ArgValue::Symbol("latest".into()))
        ),
        ModuleKind::Forge {
            version: ForgeVersion::Latest
        }
    );
}

#[test]
fn forge_with_exact_version() {
    match classify("puppetlabs/stdlib", &ModuleArgs::Version(s("6.0.0"))) {
        ModuleKind::Forge {
            version: ForgeVersion::Exact(v),
        } => assert_eq!(v.to_string(), "6.0.0"),
        other => panic!("expected Forge, got {other:?}"),
    }
}

#[test]
fn bare_name_is_invalid_for_forge() {
    assert!(matches!(
        classify("stdlib", &ModuleArgs::Version(s("6.0.0"))),
        ModuleKind::Invalid { .. }
    ));
}

#[test]
fn other_symbols_are_invalid() {
    assert!(matches!(
        classify(
            "puppetlabs/stdlib",
            &ModuleArgs::Version(ArgValue::Symbol("newest".into()))
        ),
        ModuleKind::Invalid { .. }
    ));
}

#[test]
fn git_wins_over_everything() {
    let args = opts(&[
        ("git", s("https://github.com/puppetlabs/puppetlabs-stdlib")),
        ("svn", s("svn://x")),
        ("local", ArgValue::Bool(true)),
        ("bogus", ArgValue::Int(3)),
    ]);
    match classify("bad name!", &args) {
        ModuleKind::Git { remote, reference } => {
            assert_eq!(remote, "https://github.com/puppetlabs/puppetlabs-stdlib");
            assert_eq!(reference, GitRef::DefaultBranch);
        }
        other => panic!("expected Git, got {other:?}"),
    }
}

#[test]
fn malformed_git_value_is_still_git() {
    let args = opts(&[("git", ArgValue::Int(42)), ("tag", ArgValue::Nil)]);
    assert!(matches!(classify("stdlib", &args), ModuleKind::Git { .. }));
}

#[test]
fn svn_wins_over_local_and_forge() {
    let args = opts(&[
        ("svn", s("svn://example/stdlib/trunk")),
        ("rev", ArgValue::Int(1234)),
        ("local", ArgValue::Bool(true)),
    ]);
    assert_eq!(
        classify("puppetlabs/stdlib", &args),
        ModuleKind::Svn {
            remote: "svn://example/stdlib/trunk".into(),
            revision: Some("1234".into()),
        }
    );
}

#[test]
fn local_with_flag_or_path() {
    assert_eq!(
        classify("mymodule", &opts(&[("local", ArgValue::Bool(true))])),
        ModuleKind::Local { path: None }
    );
    assert_eq!(
        classify("mymodule", &opts(&[("local", s("site/mymodule"))])),
        ModuleKind::Local {
            path: Some("site/mymodule".into())
        }
    );
}

#[test]
fn unknown_options_are_invalid() {
    match classify("puppetlabs/stdlib", &opts(&[("install_path", s("x"))])) {
        ModuleKind::Invalid { reason } => assert!(reason.contains("install_path")),
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn every_declaration_gets_exactly_one_kind() {
    let cases = vec![
        ("a/b", ModuleArgs::None),
        ("a", ModuleArgs::None),
        ("a b", ModuleArgs::Version(s("1.0.0"))),
        ("a-b", opts(&[("git", s("x")), ("svn", s("y"))])),
        ("a-b", opts(&[])),
    ];
    for (title, args) in cases {
        let kind = classify(title, &args);
        let is_git_or_svn_or_local = matches!(
            kind,
            ModuleKind::Git { .. } | ModuleKind::Svn { .. } | ModuleKind::Local { .. }
        );
        assert_eq!(
            is_git_or_svn_or_local,
            args.has_option("git") || args.has_option("svn") || args.has_option("local"),
            "{title}: {kind:?}"
        );
    }
}
