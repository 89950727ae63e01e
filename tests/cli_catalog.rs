//! Integration tests for the read-only catalog commands: list, search,
//! outdated and version.

mod common;

use common::{seed_nuxt_chain, StackDef, TestEnv};

#[test]
fn list_marks_installed_stacks_and_groups_by_category() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.registry.publish(
        "php",
        StackDef::new("1.0.0", &[], &[("php.md", "# PHP")]).categorized("backend"),
    );
    env.run(&["init", "--stacks", "vue", "--yes"]);

    let result = env.run(&["list"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(result.stdout.contains("* vue 1.0.0"), "{}", result.stdout);
    assert!(result.stdout.contains("  php 1.0.0"), "{}", result.stdout);
    assert!(result.stdout.contains("Backend"), "{}", result.stdout);
    assert!(result.stdout.contains("(1/4)"), "{}", result.stdout);
}

#[test]
fn search_matches_id_and_description() {
    let env = TestEnv::new();
    env.registry.publish(
        "vue",
        StackDef::new("1.0.0", &[], &[("vue.md", "# Vue")])
            .described("Composition API conventions"),
    );
    env.registry
        .publish("php", StackDef::new("1.0.0", &[], &[("php.md", "# PHP")]));
    env.write(
        "stackpack.toml",
        &format!(
            "version = 1\nregistry = \"{}\"\nstacks = []\n",
            env.registry.url()
        ),
    );

    let by_id = env.run(&["search", "vue"]);
    assert!(by_id.stdout.contains("vue (1.0.0)"), "{}", by_id.stdout);
    assert!(!by_id.stdout.contains("php"), "{}", by_id.stdout);

    let by_description = env.run(&["search", "composition"]);
    assert!(by_description.stdout.contains("vue"), "{}", by_description.stdout);

    let no_hit = env.run(&["search", "rails"]);
    assert!(
        no_hit.stdout.contains("no stacks found for 'rails'"),
        "{}",
        no_hit.stdout
    );
}

#[test]
fn outdated_reports_newer_and_removed_stacks() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.registry
        .publish("php", StackDef::new("1.0.0", &[], &[("php.md", "# PHP")]));
    env.run(&["init", "--stacks", "vue,php", "--yes"]);

    env.registry
        .republish("vue", "2.0.0", &[("vue.md", "# Vue 2")]);
    env.registry.unpublish("php");

    let result = env.run(&["outdated"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(result.stdout.contains("update available"), "{}", result.stdout);
    assert!(
        result.stdout.contains("removed from registry"),
        "{}",
        result.stdout
    );
    assert!(result.stdout.contains("2.0.0"), "{}", result.stdout);
}

#[test]
fn outdated_is_quiet_when_everything_is_current() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "vue", "--yes"]);

    let result = env.run(&["outdated"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(
        result.stdout.contains("all stacks up to date"),
        "{}",
        result.stdout
    );
}

#[test]
fn version_prints_the_crate_version() {
    let env = TestEnv::new();
    let result = env.run(&["version"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(
        result.stdout.contains(env!("CARGO_PKG_VERSION")),
        "{}",
        result.stdout
    );
}
