//! Integration tests for `stackpack verify`.

mod common;

use common::{seed_nuxt_chain, StackDef, TestEnv};

#[test]
fn verify_passes_on_clean_install() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "nuxt-ui", "--yes"]);

    let result = env.run(&["verify"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(result.stdout.contains("vue: ok"), "{}", result.stdout);
    assert!(
        result.stdout.contains("all stacks verified"),
        "{}",
        result.stdout
    );
}

#[test]
fn verify_reports_tampered_files() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "vue", "--yes"]);
    env.write("ai-stacks/managed/vue/vue.md", "# Edited locally\n");

    let result = env.run(&["verify"]);
    assert_eq!(result.exit_code, 5);
    assert!(
        result.stderr.contains("vue: tampered vue.md"),
        "{}",
        result.stderr
    );
    assert!(
        result.stdout.contains("run 'stackpack sync' to repair"),
        "{}",
        result.combined_output()
    );
}

#[test]
fn verify_reports_missing_files() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "vue", "--yes"]);
    std::fs::remove_file(env.path("ai-stacks/managed/vue/vue.md")).unwrap();

    let result = env.run(&["verify"]);
    assert_eq!(result.exit_code, 5);
    assert!(
        result.stderr.contains("vue: missing vue.md"),
        "{}",
        result.stderr
    );
}

#[test]
fn verify_detects_deleted_marker_block() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "vue", "--yes"]);
    env.write("CLAUDE.md", "# Scrubbed\n");

    let result = env.run(&["verify"]);
    assert_eq!(result.exit_code, 5);
    assert!(
        result.stderr.contains("CLAUDE.md: managed block missing"),
        "{}",
        result.stderr
    );
}

#[test]
fn verify_with_nothing_installed_is_a_usage_error() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.write(
        "stackpack.toml",
        &format!(
            "version = 1\nregistry = \"{}\"\nstacks = []\n",
            env.registry.url()
        ),
    );

    let result = env.run(&["verify"]);
    assert_eq!(result.exit_code, 4);
    assert!(
        result.stderr.contains("run 'stackpack sync' first"),
        "{}",
        result.stderr
    );
}

#[test]
fn strict_verify_flags_outdated_and_removed_stacks() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.registry
        .publish("php", StackDef::new("1.0.0", &[], &[("php.md", "# PHP")]));
    env.run(&["init", "--stacks", "vue,php", "--yes"]);

    env.registry
        .republish("vue", "1.1.0", &[("vue.md", "# Vue 1.1")]);
    env.registry.unpublish("php");

    let result = env.run(&["verify", "--strict"]);
    assert_eq!(result.exit_code, 5);
    assert!(
        result.stderr.contains("vue: outdated (1.0.0 locked, 1.1.0 in registry)"),
        "{}",
        result.stderr
    );
    assert!(
        result.stderr.contains("php: removed from registry"),
        "{}",
        result.stderr
    );
}

#[test]
fn strict_verify_propagates_registry_errors() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "vue", "--yes"]);

    let result = env.run(&["verify", "--strict", "--registry", "http://127.0.0.1:9"]);
    assert_eq!(result.exit_code, 3);
}
