use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use ca_adapter::{
    AdapterError, ErrorKind, Inputs, ModelParams, OutputRequest, Simulator, StaticTopology,
};
use ca_core::{AttrValue, EntityId, SourceId, SystemKey, Tolerances, nearly_equal};
use ca_models::{dh_network, heat_pump, pv_system};
use ca_schema::AdapterConfig;

const NETWORK: &str = r#"{
    "external_grid": {"junction": "j0", "supply_temperature": 30.0},
    "heat_exchangers": [
        ["hex_0", "j0", "j1", 0.0],
        ["hex_1", "j0", "j1", 0.0]
    ]
}"#;

fn scratch_file(name: &str, content: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ca_models_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn input(eid: &str, attr: &str, source: &str, value: AttrValue) -> Inputs {
    Inputs::from([(
        EntityId::new(eid),
        BTreeMap::from([(
            attr.to_string(),
            BTreeMap::from([(SourceId::new(source), value)]),
        )]),
    )])
}

fn request(eid: &str, attrs: &[&str]) -> OutputRequest {
    OutputRequest::from([(
        EntityId::new(eid),
        attrs.iter().map(|a| a.to_string()).collect(),
    )])
}

fn real(value: Option<&AttrValue>) -> f64 {
    value.and_then(AttrValue::as_real).unwrap()
}

#[test]
fn heat_pump_load_flows_into_network() {
    let network_path = scratch_file("network.json", NETWORK);

    let mut pumps = heat_pump::adapter().unwrap();
    pumps.init(&AdapterConfig::new("HPSim-0", 900)).unwrap();
    let created = pumps
        .create(
            1,
            heat_pump::KIND,
            ModelParams::new()
                .with("cop_nominal", 4.0)
                .with("heat_capacity_nominal", 40.0e3)
                .with("temp_min", 50.0)
                .with("temp_max", 60.0),
        )
        .unwrap();
    assert_eq!(created[0].eid.as_str(), "HeatPump_0");
    pumps.setup_done().unwrap();

    let mut net = dh_network::adapter().unwrap();
    net.connect_driver(Arc::new(StaticTopology::new().connect(
        "DHSim-0.DHNetwork_0_HeatExchanger_0",
        "HPSim-0.HeatPump_0",
        heat_pump::KIND,
    )));
    net.init(&AdapterConfig::new("DHSim-0", 900)).unwrap();
    let created = net
        .create(
            1,
            dh_network::KIND,
            ModelParams::new()
                .with("network_definition_path", network_path.display().to_string())
                .with("num_channels", 2i64)
                .with("grid_massflow", 4.0),
        )
        .unwrap();
    assert_eq!(created[0].children.len(), 2);
    net.setup_done().unwrap();

    let mut time = 0;
    let mut consumption = 0.0;
    for _ in 0..3 {
        let next = pumps.step(time, &Inputs::new(), None).unwrap();
        let out = pumps
            .get_data(&request("HeatPump_0", &["heat_consumption"]))
            .unwrap();
        consumption = real(out.value("HeatPump_0", "heat_consumption"));

        let hex_input = input(
            "DHNetwork_0_HeatExchanger_0",
            "heat_consumption",
            "HPSim-0.HeatPump_0",
            AttrValue::Float(consumption),
        );
        assert_eq!(net.step(time, &hex_input, None).unwrap(), next);
        time = next;
    }

    let data = net
        .get_data(&request(
            "DHNetwork_0_HeatExchanger_0",
            &["heat_consumption", "supply_temperature", "massflow"],
        ))
        .unwrap();
    assert_eq!(
        real(data.value("DHNetwork_0_HeatExchanger_0", "heat_consumption")),
        consumption
    );
    assert_eq!(real(data.value("DHNetwork_0_HeatExchanger_0", "massflow")), 2.0);
    assert_eq!(
        real(data.value("DHNetwork_0_HeatExchanger_0", "supply_temperature")),
        30.0
    );

    let grid = net
        .get_data(&request("DHNetwork_0", &["grid_return_temperature"]))
        .unwrap();
    let expected = 30.0 - consumption / (2.0 * ca_core::units::HEAT_CAPACITY_WATER) / 2.0;
    assert!(nearly_equal(
        real(grid.value("DHNetwork_0", "grid_return_temperature")),
        expected,
        Tolerances::default()
    ));

    // The second exchanger has no consumer plugged in.
    let err = net
        .get_data(&request("DHNetwork_0_HeatExchanger_1", &["massflow"]))
        .unwrap_err();
    assert!(matches!(err, AdapterError::UnconnectedChannel { .. }));
}

#[test]
fn extra_consumers_stay_unassigned() {
    let network_path = scratch_file("small_network.json", NETWORK);
    let mut net = dh_network::adapter().unwrap();
    net.connect_driver(Arc::new(
        StaticTopology::new()
            .connect("DHSim-0.DHNetwork_0_HeatExchanger_0", "S.a", "Building")
            .connect("DHSim-0.DHNetwork_0_HeatExchanger_1", "S.b", "Building")
            .connect("DHSim-0.DHNetwork_0_HeatExchanger_2", "S.c", "Building"),
    ));
    net.init(&AdapterConfig::new("DHSim-0", 900)).unwrap();
    net.create(
        1,
        dh_network::KIND,
        ModelParams::new()
            .with("network_definition_path", network_path.display().to_string())
            .with("num_channels", 3i64),
    )
    .unwrap();
    net.setup_done().unwrap();

    let network = net.controller("DHNetwork_0").unwrap();
    assert_eq!(network.heat_exchanger_of(&SystemKey::new("S.a")), Some("hex_0"));
    assert_eq!(network.heat_exchanger_of(&SystemKey::new("S.b")), Some("hex_1"));
    assert_eq!(network.heat_exchanger_of(&SystemKey::new("S.c")), None);
    assert_eq!(net.step(0, &Inputs::new(), None).unwrap(), 900);
}

#[test]
fn two_networks_assign_their_own_consumers() {
    let network_path = scratch_file("twin_network.json", NETWORK);
    let mut net = dh_network::adapter().unwrap();
    net.connect_driver(Arc::new(
        StaticTopology::new()
            .connect("DHSim-0.DHNetwork_0_HeatExchanger_0", "S.a", "Building")
            .connect("DHSim-0.DHNetwork_0_HeatExchanger_1", "S.b", "Building")
            .connect("DHSim-0.DHNetwork_1_HeatExchanger_0", "S.c", "Building")
            .connect("DHSim-0.DHNetwork_1_HeatExchanger_1", "S.d", "Building"),
    ));
    net.init(&AdapterConfig::new("DHSim-0", 900)).unwrap();
    let created = net
        .create(
            2,
            dh_network::KIND,
            ModelParams::new()
                .with("network_definition_path", network_path.display().to_string())
                .with("num_channels", 2i64),
        )
        .unwrap();
    assert_eq!(created.len(), 2);
    net.setup_done().unwrap();

    let first = net.controller("DHNetwork_0").unwrap();
    assert_eq!(first.heat_exchanger_of(&SystemKey::new("S.a")), Some("hex_0"));
    assert_eq!(first.heat_exchanger_of(&SystemKey::new("S.b")), Some("hex_1"));
    assert_eq!(first.heat_exchanger_of(&SystemKey::new("S.c")), None);

    let second = net.controller("DHNetwork_1").unwrap();
    assert_eq!(second.heat_exchanger_of(&SystemKey::new("S.c")), Some("hex_0"));
    assert_eq!(second.heat_exchanger_of(&SystemKey::new("S.d")), Some("hex_1"));
    assert_eq!(second.heat_exchanger_of(&SystemKey::new("S.a")), None);

    let hex_input = input(
        "DHNetwork_1_HeatExchanger_1",
        "heat_consumption",
        "S.d",
        AttrValue::Float(8.0e3),
    );
    net.step(0, &hex_input, None).unwrap();
    let data = net
        .get_data(&request("DHNetwork_1_HeatExchanger_1", &["heat_consumption"]))
        .unwrap();
    assert_eq!(
        real(data.value("DHNetwork_1_HeatExchanger_1", "heat_consumption")),
        8.0e3
    );
    assert!(
        real(
            net.get_data(&request("DHNetwork_1", &["grid_return_temperature"]))
                .unwrap()
                .value("DHNetwork_1", "grid_return_temperature")
        ) < 30.0
    );
}

#[test]
fn missing_network_file_fails_create() {
    let mut net = dh_network::adapter().unwrap();
    net.init(&AdapterConfig::new("DHSim-0", 900)).unwrap();
    let err = net
        .create(
            1,
            dh_network::KIND,
            ModelParams::new()
                .with("network_definition_path", "/nonexistent/network.json")
                .with("num_channels", 1i64),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Model);
}

#[test]
fn pv_adapter_replays_profile() {
    let csv = scratch_file(
        "pv.csv",
        "time,pv\n2023-06-01 00:00:00,0.0\n2023-06-01 00:15:00,0.5\n",
    );
    let mut pv = pv_system::adapter().unwrap();
    pv.init(&AdapterConfig::new("PVSim-0", 900)).unwrap();
    pv.create(
        2,
        pv_system::KIND,
        ModelParams::new()
            .with("start_time", "2023-06-01 00:00:00")
            .with("peak_power", 10.0e3)
            .with("csv_path", csv.display().to_string()),
    )
    .unwrap();
    pv.setup_done().unwrap();

    assert_eq!(pv.step(0, &Inputs::new(), None).unwrap(), 900);
    assert_eq!(pv.step(900, &Inputs::new(), Some(300)).unwrap(), 1200);
    let data = pv
        .get_data(&request("PvSystem_1", &["power_output"]))
        .unwrap();
    assert_eq!(real(data.value("PvSystem_1", "power_output")), -5.0e3);
}
