//! Integration tests for `stackpack sync`.

mod common;

use common::{seed_nuxt_chain, StackDef, TestEnv};

#[test]
fn sync_updates_when_registry_publishes_new_version() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "nuxt-ui", "--yes"]);

    env.registry
        .republish("nuxt-ui", "3.1.0", &[("nuxt-ui.md", "# Nuxt UI v3.1")]);

    let result = env.run(&["sync"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(
        result.stdout.contains("nuxt-ui: 3.0.0 -> 3.1.0"),
        "{}",
        result.stdout
    );
    assert_eq!(env.read("ai-stacks/managed/nuxt-ui/nuxt-ui.md"), "# Nuxt UI v3.1");
    assert!(env.read("stackpack.lock").contains("version = \"3.1.0\""));
}

#[test]
fn sync_keeps_intact_stacks_untouched() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "nuxt-ui", "--yes"]);

    let result = env.run(&["sync"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(
        result.stdout.contains("0 updated, 0 installed, 3 unchanged"),
        "{}",
        result.stdout
    );
}

#[test]
fn sync_repairs_tampered_content() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "vue", "--yes"]);

    env.write("ai-stacks/managed/vue/vue.md", "tampered");

    let result = env.run(&["sync"]);
    assert!(result.success, "{}", result.combined_output());
    assert_eq!(env.read("ai-stacks/managed/vue/vue.md"), "# Vue");
}

#[test]
fn sync_installs_stacks_added_to_config_by_hand() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.registry
        .publish("php", StackDef::new("1.0.0", &[], &[("php.md", "# PHP")]));
    env.run(&["init", "--stacks", "vue", "--yes"]);

    env.write(
        "stackpack.toml",
        &format!(
            "version = 1\nregistry = \"{}\"\nstacks = [\"vue\", \"php\"]\n",
            env.registry.url()
        ),
    );

    let result = env.run(&["sync"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(env.path("ai-stacks/managed/php/php.md").exists());
}

#[test]
fn sync_cleans_up_stacks_no_longer_needed() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "nuxt-ui", "--yes"]);

    env.write(
        "stackpack.toml",
        &format!(
            "version = 1\nregistry = \"{}\"\nstacks = [\"vue\"]\n",
            env.registry.url()
        ),
    );

    let result = env.run(&["sync"]);
    assert!(result.success, "{}", result.combined_output());
    assert!(env.path("ai-stacks/managed/vue").exists());
    assert!(!env.path("ai-stacks/managed/nuxt").exists());
    assert!(!env.path("ai-stacks/managed/nuxt-ui").exists());

    let lock = env.read("stackpack.lock");
    assert!(!lock.contains("[stacks.nuxt-ui]"), "{lock}");
}

#[test]
fn sync_without_config_exits_with_config_error() {
    let env = TestEnv::new();
    let result = env.run(&["sync"]);
    assert_eq!(result.exit_code, 2);
    assert!(
        result.stderr.contains("stackpack init"),
        "{}",
        result.stderr
    );
}

#[test]
fn sync_against_unreachable_registry_exits_with_network_error() {
    let env = TestEnv::new();
    seed_nuxt_chain(&env.registry);
    env.run(&["init", "--stacks", "vue", "--yes"]);

    // Point at a port nothing listens on.
    let result = env.run(&["sync", "--registry", "http://127.0.0.1:9"]);
    assert_eq!(result.exit_code, 3);
}
