//! Slot registry snapshot benchmarks.
//!
//! Measures `build_system_info` for the largest layouts the UI polls on
//! every state change.

use criterion::{Criterion, criterion_group, criterion_main};
use helix_common::ams::types::AmsSystemInfo;
use helix_common::slot_registry::SlotRegistry;
use std::collections::BTreeMap;
use std::hint::black_box;

fn layout(units: usize, per_unit: usize) -> Vec<(String, Vec<String>)> {
    (0..units)
        .map(|u| {
            let names = (0..per_unit).map(|s| format!("lane{}", u * per_unit + s)).collect();
            (format!("Unit_{u}"), names)
        })
        .collect()
}

fn bench_build_system_info(c: &mut Criterion) {
    let mut reg = SlotRegistry::new();
    reg.initialize_units(&layout(4, 4));
    let tools: Vec<i32> = (0..16).collect();
    reg.set_tool_map(&tools);

    c.bench_function("registry_build_system_info_16", |b| {
        let mut info = AmsSystemInfo::default();
        b.iter(|| {
            reg.build_system_info(black_box(&mut info));
        });
    });
}

fn bench_reorganize(c: &mut Criterion) {
    let map: BTreeMap<String, Vec<String>> = layout(3, 4).into_iter().rev().collect();

    c.bench_function("registry_reorganize_12", |b| {
        let mut reg = SlotRegistry::new();
        reg.initialize_units(&layout(3, 4));
        b.iter(|| {
            reg.reorganize(black_box(&map));
        });
    });
}

fn bench_tool_lookup(c: &mut Criterion) {
    let mut reg = SlotRegistry::new();
    reg.initialize_units(&layout(4, 4));
    reg.set_tool_map(&(0..16).rev().collect::<Vec<_>>());

    c.bench_function("registry_slot_for_tool", |b| {
        b.iter(|| {
            for tool in 0..16 {
                black_box(reg.slot_for_tool(black_box(tool)));
            }
        });
    });
}

criterion_group!(
    benches,
    bench_build_system_info,
    bench_reorganize,
    bench_tool_lookup
);
criterion_main!(benches);
