//! End-to-end convergence against the simulator backend.
//!
//! Drives the real composition: group config, sim plugins, `ScaledGroup`,
//! and a supervisor, exactly as the daemon wires them.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use drover_group::{validate_group, GroupConfig, ScaledGroup, GROUP_TAG};
use drover_scaler::{Quorum, Scaler};
use drover_sim::{SimInstancePlugin, VanillaFlavor};
use drover_spi::{Allocation, InstancePlugin, InstanceSpec, LogicalId, Tags};

fn group_config(id: &str, allocation: Allocation) -> GroupConfig {
    GroupConfig {
        id: id.to_string(),
        allocation,
        poll_interval: Duration::from_millis(5),
        buffer: 0,
        instance_properties: serde_json::json!({ "size": "small" }),
        flavor_properties: serde_json::json!({
            "tags": { "tier": "web" },
            "init": "systemctl start web"
        }),
    }
}

async fn wait_for_count(sim: &SimInstancePlugin, want: usize) {
    for _ in 0..400 {
        if sim.instance_count().await == want {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "simulator never reached {want} instances, has {}",
        sim.instance_count().await
    );
}

#[tokio::test]
async fn size_group_converges_and_self_heals() {
    let sim = SimInstancePlugin::new();
    let flavor = VanillaFlavor::new();
    let config = group_config("web", Allocation::Size(3));

    validate_group(&config, &sim, &flavor).await.expect("valid group");
    let scaled = ScaledGroup::new(sim.clone(), flavor, config).expect("composable");
    let scaler = Arc::new(
        Scaler::new(scaled, 3, Duration::from_millis(5), 0).expect("valid supervisor"),
    );

    let runner = tokio::spawn({
        let scaler = scaler.clone();
        async move { scaler.run().await }
    });

    // Cold start: three members appear, fully tagged and flavored.
    wait_for_count(&sim, 3).await;
    for member in sim.descriptions().await {
        assert_eq!(member.tags.get(GROUP_TAG), Some(&"web".to_string()));
        assert_eq!(member.tags.get("tier"), Some(&"web".to_string()));
        let spec = sim.spec_of(&member.id).await.expect("spec recorded");
        assert_eq!(spec.init, "systemctl start web");
    }

    // Kill a member behind the supervisor's back; it gets replaced.
    let victim = sim.descriptions().await[0].id.clone();
    sim.destroy(&victim).await.expect("destroy");
    wait_for_count(&sim, 3).await;

    // Sneak in a surplus member wearing the group tag; the excess is
    // trimmed back to target.
    let mut tags = Tags::new();
    tags.insert(GROUP_TAG.to_string(), "web".to_string());
    sim.provision(InstanceSpec {
        tags,
        ..InstanceSpec::default()
    })
    .await
    .expect("provision surplus");
    wait_for_count(&sim, 3).await;

    scaler.stop();
    timeout(Duration::from_secs(5), runner)
        .await
        .expect("scaler did not stop")
        .expect("scaler task panicked");
}

#[tokio::test]
async fn quorum_group_restores_its_identities() {
    let sim = SimInstancePlugin::new();
    let flavor = VanillaFlavor::new();
    let ids = vec![LogicalId::from("10.0.0.1"), LogicalId::from("10.0.0.2")];
    let config = group_config("zk", Allocation::LogicalIds(ids.clone()));

    // Seed a member with an identity the quorum does not expect.
    let mut tags = Tags::new();
    tags.insert(GROUP_TAG.to_string(), "zk".to_string());
    sim.provision(InstanceSpec {
        tags,
        logical_id: Some(LogicalId::from("10.9.9.9")),
        ..InstanceSpec::default()
    })
    .await
    .expect("provision intruder");

    validate_group(&config, &sim, &flavor).await.expect("valid group");
    let scaled = ScaledGroup::new(sim.clone(), flavor, config).expect("composable");
    let quorum = Arc::new(
        Quorum::new(scaled, ids.clone(), Duration::from_millis(5)).expect("valid supervisor"),
    );

    let runner = tokio::spawn({
        let quorum = quorum.clone();
        async move { quorum.run().await }
    });

    let mut converged = false;
    for _ in 0..400 {
        let mut got: Vec<LogicalId> = sim
            .descriptions()
            .await
            .into_iter()
            .filter_map(|member| member.logical_id)
            .collect();
        got.sort_unstable();
        if got == ids && sim.instance_count().await == ids.len() {
            converged = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    quorum.stop();
    timeout(Duration::from_secs(5), runner)
        .await
        .expect("quorum did not stop")
        .expect("quorum task panicked");

    assert!(converged, "quorum never reached its identity set");
}

#[tokio::test]
async fn validation_rejects_a_bad_flavor_document() {
    let sim = SimInstancePlugin::new();
    let flavor = VanillaFlavor::new();
    let mut config = group_config("web", Allocation::Size(1));
    config.flavor_properties = serde_json::json!({ "bogus": true });

    let result = validate_group(&config, &sim, &flavor).await;
    assert!(result.is_err());
}
