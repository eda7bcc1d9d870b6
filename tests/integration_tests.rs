use statgraph::nodes::{CalculationNode, DependencyKey, NodeKey};
use statgraph::value::{formula, FunctionalValue};
use statgraph::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn global(stat: &Stat, form: Form, value: f64) -> Modifier {
    Modifier::constant(vec![stat.clone()], form, value, ModifierSource::Global)
}

fn counting(calls: &Rc<Cell<usize>>, value: f64) -> Rc<dyn Value> {
    let calls = calls.clone();
    Rc::new(FunctionalValue::new("counting", move |_| {
        calls.set(calls.get() + 1);
        Ok(Some(NodeValue::from(value)))
    }))
}

/// Life 100 with 20% increased, then another 10% increased.
#[test]
fn test_life_end_to_end() {
    let calculator = Calculator::new();
    let life = Stat::new("Life");
    let mana = Stat::new("Mana");

    let mana_calls = Rc::new(Cell::new(0));
    calculator.add_modifier(Modifier::new(
        vec![mana.clone()],
        Form::BaseAdd,
        counting(&mana_calls, 50.0),
        ModifierSource::Global,
    ));
    assert_eq!(calculator.total(&mana).unwrap(), Some(NodeValue::from(50.0)));

    calculator.add_modifier(global(&life, Form::BaseAdd, 100.0));
    calculator.add_modifier(global(&life, Form::Increase, 20.0));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(120.0)));

    calculator.add_modifier(global(&life, Form::Increase, 10.0));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(130.0)));

    // Mana was not touched by any of the Life changes.
    assert_eq!(calculator.total(&mana).unwrap(), Some(NodeValue::from(50.0)));
    assert_eq!(mana_calls.get(), 1);
}

#[test]
fn test_stat_without_modifiers_is_absent() {
    let calculator = Calculator::new();
    let life = Stat::new("Life");
    assert_eq!(calculator.total(&life).unwrap(), None);

    let other = Stat::new("Other");
    calculator.add_modifier(global(&other, Form::Increase, 20.0));
    assert_eq!(calculator.total(&other).unwrap(), None);
}

#[test]
fn test_cached_value_is_computed_once() {
    let calculator = Calculator::new();
    let life = Stat::new("Life");
    let calls = Rc::new(Cell::new(0));
    calculator.add_modifier(Modifier::new(
        vec![life.clone()],
        Form::BaseAdd,
        counting(&calls, 10.0),
        ModifierSource::Global,
    ));

    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(10.0)));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(10.0)));
    assert_eq!(calls.get(), 1);

    // An unrelated change of the same stat keeps the modifier cached.
    calculator.add_modifier(global(&life, Form::More, 100.0));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(20.0)));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_self_reference_is_a_cycle() {
    let calculator = Calculator::new();
    let life = Stat::new("Life");
    let reads_life = {
        let life = life.clone();
        formula("life total", move |c| c.total(&life))
    };
    let modifier = Modifier::new(vec![life.clone()], Form::BaseAdd, reads_life, ModifierSource::Global);
    calculator.add_modifier(modifier.clone());

    match calculator.total(&life) {
        Err(err @ CalculationError::Cycle { .. }) => {
            assert!(err.is_closed_cycle());
            if let CalculationError::Cycle { path } = err {
                assert_eq!(path.first().map(String::as_str), Some("Life Total"));
                assert!(path.iter().any(|label| label == "Life BaseAdd"));
            }
        }
        other => panic!("Expected Cycle error, got {:?}", other),
    }
    // Errors are not cached.
    assert!(calculator.total(&life).is_err());

    calculator.remove_modifier(modifier);
    assert_eq!(calculator.total(&life).unwrap(), None);
}

#[test]
fn test_cycle_between_stats() {
    let calculator = Calculator::new();
    let strength = Stat::new("Strength");
    let dexterity = Stat::new("Dexterity");
    let reads = |stat: &Stat| {
        let stat = stat.clone();
        formula("total", move |c| c.total(&stat))
    };
    calculator.add_modifier(Modifier::new(
        vec![strength.clone()],
        Form::BaseAdd,
        reads(&dexterity),
        ModifierSource::Global,
    ));
    calculator.add_modifier(Modifier::new(
        vec![dexterity.clone()],
        Form::BaseAdd,
        reads(&strength),
        ModifierSource::Global,
    ));

    match calculator.total(&strength) {
        Err(CalculationError::Cycle { path }) => {
            assert_eq!(path.first(), path.last());
            assert!(path.iter().any(|label| label == "Dexterity Total"));
        }
        other => panic!("Expected Cycle error, got {:?}", other),
    }
}

#[test]
fn test_base_set_and_override_rules() {
    let calculator = Calculator::new();
    let life = Stat::new("Life");

    let five = global(&life, Form::BaseSet, 5.0);
    calculator.add_modifier(five.clone());
    calculator.add_modifier(global(&life, Form::BaseSet, 0.0));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(5.0)));

    calculator.add_modifier(global(&life, Form::BaseSet, 3.0));
    assert!(matches!(
        calculator.total(&life),
        Err(CalculationError::AmbiguousBaseSet { .. })
    ));
    calculator.remove_modifier(five);
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(3.0)));

    calculator.add_modifier(global(&life, Form::TotalOverride, 7.0));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(7.0)));
    calculator.add_modifier(global(&life, Form::TotalOverride, 5.0));
    assert!(matches!(
        calculator.total(&life),
        Err(CalculationError::ConflictingOverrides { .. })
    ));
    calculator.add_modifier(global(&life, Form::TotalOverride, 0.0));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::ZERO));
}

#[test]
fn test_subtotal_is_clipped_to_bounds() {
    let calculator = Calculator::new();
    let maximum = Stat::new("Life.Maximum");
    let minimum = Stat::new("Life.Minimum");
    let life = Stat::builder("Life")
        .minimum(minimum.clone())
        .maximum(maximum.clone())
        .build();

    calculator.add_modifier(global(&maximum, Form::BaseAdd, 100.0));
    calculator.add_modifier(global(&minimum, Form::BaseAdd, 1.0));
    calculator.add_modifier(global(&life, Form::BaseAdd, 150.0));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(100.0)));
    assert_eq!(
        calculator
            .node_value(&life, NodeType::UncappedSubtotal, &PathDefinition::main())
            .unwrap(),
        Some(NodeValue::from(150.0))
    );

    // Zero is never clipped.
    calculator.add_modifier(global(&life, Form::More, -100.0));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::ZERO));
}

#[test]
fn test_minimum_wins_over_lower_maximum() {
    let calculator = Calculator::new();
    let maximum = Stat::new("Life.Maximum");
    let minimum = Stat::new("Life.Minimum");
    let life = Stat::builder("Life")
        .minimum(minimum.clone())
        .maximum(maximum.clone())
        .build();

    calculator.add_modifier(global(&maximum, Form::BaseAdd, 10.0));
    calculator.add_modifier(global(&minimum, Form::BaseAdd, 20.0));
    calculator.add_modifier(global(&life, Form::BaseAdd, 15.0));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(20.0)));
}

#[test]
fn test_local_modifiers_get_global_increases() {
    let calculator = Calculator::new();
    let armour = Stat::new("Armour");
    let helm = ModifierSource::Local(LocalSource::Item(ItemSlot::Helm));
    let boots = ModifierSource::Local(LocalSource::Item(ItemSlot::Boots));

    calculator.add_modifier(Modifier::constant(vec![armour.clone()], Form::BaseAdd, 100.0, helm.clone()));
    calculator.add_modifier(Modifier::constant(vec![armour.clone()], Form::BaseAdd, 50.0, boots.clone()));
    calculator.add_modifier(Modifier::constant(vec![armour.clone()], Form::Increase, 100.0, helm.clone()));
    calculator.add_modifier(global(&armour, Form::Increase, 20.0));

    // Helm: 100 * (1 + 1.0 + 0.2), boots: 50 * (1 + 0.2)
    assert_eq!(calculator.total(&armour).unwrap(), Some(NodeValue::from(280.0)));
    assert_eq!(
        calculator
            .node_value(&armour, NodeType::PathTotal, &PathDefinition::new(boots))
            .unwrap(),
        Some(NodeValue::from(60.0))
    );
}

#[test]
fn test_range_values() {
    let calculator = Calculator::new();
    let damage = Stat::new("Physical.Damage");
    calculator.add_modifier(Modifier::new(
        vec![damage.clone()],
        Form::BaseSet,
        Rc::new(value::ConstantValue::new(Some(NodeValue::new(10.0, 20.0)))),
        ModifierSource::Global,
    ));
    calculator.add_modifier(global(&damage, Form::Increase, 50.0));
    assert_eq!(calculator.total(&damage).unwrap(), Some(NodeValue::new(15.0, 30.0)));
}

#[test]
fn test_external_notifications_are_batched() {
    let calculator = Calculator::new();
    let life = Stat::new("Life");
    calculator.add_modifier(global(&life, Form::BaseAdd, 100.0));

    let total = calculator.node(&life, NodeType::Total, &PathDefinition::main());
    let notified = Rc::new(Cell::new(0));
    let counter = notified.clone();
    let _subscription = total.value_changed().subscribe(move |_| counter.set(counter.get() + 1));
    assert_eq!(total.value().unwrap(), Some(NodeValue::from(100.0)));

    calculator.batch(|| {
        calculator.add_modifier(global(&life, Form::Increase, 10.0));
        calculator.add_modifier(global(&life, Form::Increase, 10.0));
        calculator.add_modifier(global(&life, Form::More, 10.0));
        assert_eq!(notified.get(), 0);
    });
    assert_eq!(notified.get(), 1);
    assert_eq!(total.value().unwrap(), Some(NodeValue::from(132.0)));
}

#[test]
fn test_unbuffered_notifications_are_immediate() {
    let calculator = Calculator::with_config(CalculatorConfig {
        prune_after_update: true,
        buffer_events: false,
    });
    let life = Stat::new("Life");
    calculator.add_modifier(global(&life, Form::BaseAdd, 100.0));

    let total = calculator.node(&life, NodeType::Total, &PathDefinition::main());
    let notified = Rc::new(Cell::new(0));
    let counter = notified.clone();
    let _subscription = total.value_changed().subscribe(move |_| counter.set(counter.get() + 1));
    total.value().unwrap();

    calculator.batch(|| {
        calculator.add_modifier(global(&life, Form::Increase, 10.0));
        assert_eq!(notified.get(), 1);
    });
    assert_eq!(notified.get(), 1);
}

#[test]
fn test_dispose_releases_subscriptions() {
    let calculator = Calculator::with_config(CalculatorConfig {
        prune_after_update: false,
        buffer_events: true,
    });
    let life = Stat::new("Life");
    calculator.add_modifier(global(&life, Form::BaseAdd, 100.0));

    let main = PathDefinition::main();
    let subtotal = calculator.node(&life, NodeType::Subtotal, &main);
    let override_node = calculator.node(&life, NodeType::TotalOverride, &main);
    assert_eq!(subtotal.internal_subscriber_count(), 0);

    let total = calculator.node(&life, NodeType::Total, &main);
    assert_eq!(total.value().unwrap(), Some(NodeValue::from(100.0)));
    assert_eq!(subtotal.internal_subscriber_count(), 1);
    assert_eq!(override_node.internal_subscriber_count(), 1);

    total.dispose();
    assert_eq!(subtotal.internal_subscriber_count(), 0);
    assert_eq!(override_node.internal_subscriber_count(), 0);
}

#[test]
fn test_pruning_after_update() {
    let calculator = Calculator::new();
    let life = Stat::new("Life");
    let mana = Stat::new("Mana");
    assert_eq!(calculator.total(&mana).unwrap(), None);
    assert!(calculator.repository().subgraph(&mana).is_some());

    calculator.add_modifier(global(&life, Form::BaseAdd, 1.0));
    assert!(calculator.repository().subgraph(&mana).is_none());
    assert!(calculator.repository().subgraph(&life).is_some());
}

#[test]
fn test_pruning_on_demand() {
    let calculator = Calculator::with_config(CalculatorConfig {
        prune_after_update: false,
        buffer_events: true,
    });
    let life = Stat::new("Life");
    let modifier = global(&life, Form::BaseAdd, 1.0);
    calculator.add_modifier(modifier.clone());
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(1.0)));

    calculator.remove_modifier(modifier);
    assert!(calculator.repository().subgraph(&life).is_some());
    assert!(calculator.remove_unused_nodes() > 0);
    assert!(calculator.repository().stats().is_empty());
    assert_eq!(calculator.remove_unused_nodes(), 0);

    // The stat comes back on the next read.
    assert_eq!(calculator.total(&life).unwrap(), None);
}

#[test]
fn test_explicitly_registered_stats() {
    let calculator = Calculator::new();
    let armour = Stat::builder("Armour").explicitly_registered(true).build();
    let evasion = Stat::builder("Evasion").explicitly_registered(true).build();
    let hidden = Stat::new("Hidden");

    calculator.add_modifier(global(&evasion, Form::BaseAdd, 10.0));
    calculator.add_modifier(global(&hidden, Form::BaseAdd, 10.0));
    calculator.add_modifier(global(&armour, Form::BaseAdd, 20.0));

    let registered = calculator.explicitly_registered_stats();
    let ids: Vec<&str> = registered.iter().map(|(stat, _)| stat.id().as_str()).collect();
    assert_eq!(ids, ["Evasion", "Armour"]);
    assert_eq!(registered[1].1.value().unwrap(), Some(NodeValue::from(20.0)));
}

#[test]
fn test_registration_changes_are_raised() {
    let calculator = Calculator::new();
    let armour = Stat::builder("Armour").explicitly_registered(true).build();
    let changes = Rc::new(RefCell::new(Vec::new()));
    let recorded = changes.clone();
    let _subscription = calculator
        .explicitly_registered_stats_changed()
        .subscribe(move |change: &RegistryChange| recorded.borrow_mut().push(change.clone()));

    let base = global(&armour, Form::BaseAdd, 20.0);
    let increase = global(&armour, Form::Increase, 10.0);
    calculator.update(CalculatorUpdate::new().add(base.clone()).add(increase.clone()));
    assert_eq!(*changes.borrow(), vec![RegistryChange::Added(armour.clone())]);

    // Once the stat has no modifiers, pruning unregisters it.
    calculator.update(CalculatorUpdate::new().remove(base).remove(increase));
    assert_eq!(
        *changes.borrow(),
        vec![
            RegistryChange::Added(armour.clone()),
            RegistryChange::Removed(armour.clone()),
        ]
    );
    assert!(calculator.explicitly_registered_stats().is_empty());
}

#[test]
fn test_snapshot_breakdown() {
    let calculator = Calculator::new();
    let life = Stat::new("Life");
    calculator.add_modifier(global(&life, Form::BaseAdd, 100.0));
    calculator.add_modifier(Modifier::constant(
        vec![life.clone()],
        Form::BaseAdd,
        10.0,
        ModifierSource::Local(LocalSource::Given),
    ));
    calculator.add_modifier(global(&life, Form::Increase, 20.0));

    let snapshot = calculator.snapshot(&life).unwrap();
    assert_eq!(snapshot.total, Some(NodeValue::from(132.0)));
    assert_eq!(snapshot.paths.len(), 2);
    let given = snapshot.path("Given").unwrap();
    assert_eq!(given.base, Some(NodeValue::from(10.0)));
    assert_eq!(given.increase, Some(NodeValue::from(0.2)));
    assert_eq!(given.more, None);
    assert_eq!(given.path_total, Some(NodeValue::from(12.0)));

    let json: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
    assert_eq!(json["stat"]["id"], "Life");
    assert_eq!(json["paths"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_dependency_graph_of_live_nodes() {
    let calculator = Calculator::new();
    let life = Stat::new("Life");
    let strength = Stat::new("Strength");
    calculator.add_modifier(global(&strength, Form::BaseAdd, 50.0));
    let half_strength = {
        let strength = strength.clone();
        formula("half strength", move |c| Ok(c.total(&strength)?.map(|v| v / 2.0)))
    };
    calculator.add_modifier(Modifier::new(
        vec![life.clone()],
        Form::BaseAdd,
        half_strength,
        ModifierSource::Global,
    ));
    assert_eq!(calculator.total(&life).unwrap(), Some(NodeValue::from(25.0)));

    let graph = calculator.dependency_graph();
    let total = |stat: &Stat| {
        DependencyKey::Node(NodeKey {
            stat: stat.key().clone(),
            node_type: NodeType::Total,
            path: PathDefinition::main(),
        })
    };
    let order = graph.evaluation_order().unwrap();
    let position = |key: &DependencyKey| order.iter().position(|k| k == key).unwrap();
    assert!(position(&total(&strength)) < position(&total(&life)));
    assert!(!graph.dependencies_of(&total(&life)).is_empty());
}

#[test]
fn test_config_from_json() {
    let config = CalculatorConfig::from_json(r#"{ "buffer_events": false }"#).unwrap();
    assert!(config.prune_after_update);
    assert!(!config.buffer_events);
    assert!(CalculatorConfig::from_json("not json").is_err());
}
