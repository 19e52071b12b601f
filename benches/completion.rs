//! Completion latency on a mid-sized playbook, clean and half-typed.

use std::fmt::Write;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use playbook_lsp::catalog::{DirectiveCatalog, ModuleCatalog, StaticParameters};
use playbook_lsp::completion::handler::run_completion;
use playbook_lsp::types::Cursor;
use playbook_lsp::util::default_cursor;
use playbook_lsp::Catalogs;

fn catalogs() -> Catalogs {
    let modules: Vec<String> = (0..500)
        .map(|i| format!("module_{i:03}"))
        .chain(["shell", "command", "yum", "copy", "debug"].map(String::from))
        .collect();
    Catalogs::new(
        DirectiveCatalog::builtin().unwrap(),
        ModuleCatalog::from_names(modules),
        StaticParameters::new([("yum", ["name", "state", "enablerepo"])]),
    )
}

/// A playbook with `plays` plays of `tasks` tasks each.
fn playbook(plays: usize, tasks: usize) -> String {
    let mut text = String::from("---\n");
    for p in 0..plays {
        writeln!(text, "- name: play {p}\n  hosts: group_{p}\n  become: true\n  tasks:").unwrap();
        for t in 0..tasks {
            writeln!(
                text,
                "    - name: task {t}\n      yum:\n        name: package_{t}\n        state: present\n      when: item is defined"
            )
            .unwrap();
        }
    }
    text
}

fn bench_complete(c: &mut Criterion) {
    let catalogs = catalogs();
    let mut group = c.benchmark_group("completion/end_of_document");

    for size in [5, 20, 50] {
        let clean = playbook(4, size);
        // A task key still missing its colon, a single repair.
        let half_typed = format!("{clean}    - name: last\n      shel");

        for (name, source) in [("clean", clean), ("half_typed", half_typed)] {
            let cursor = default_cursor(&source);
            group.throughput(Throughput::Bytes(source.len() as u64));
            group.bench_with_input(
                BenchmarkId::new(name, size),
                &(source, cursor),
                |b, (source, cursor): &(String, Cursor)| {
                    b.iter(|| run_completion(&catalogs, black_box(source), *cursor, 64, None))
                },
            );
        }
    }

    group.finish();
}

fn bench_many_repairs(c: &mut Criterion) {
    let catalogs = catalogs();
    let mut source = playbook(1, 5);
    // Play keys without colons, one repair each.
    for i in 0..20 {
        writeln!(source, "  key_{i}").unwrap();
    }
    let cursor = default_cursor(&source);

    c.bench_function("completion/many_repairs", |b| {
        b.iter(|| run_completion(&catalogs, black_box(&source), cursor, 0, None))
    });
}

criterion_group!(benches, bench_complete, bench_many_repairs);
criterion_main!(benches);
