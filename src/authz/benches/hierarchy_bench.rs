//! Hierarchy and menu resolution benchmarks

use atlas_authz::{build_forest, AtlasEngine, Hierarchy};
use atlas_core::types::{Id, Menu, Permission, Role, User};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::Runtime;

/// `count` menus, each pointing at the one `fanout` positions before it
fn wide_menus(count: usize, fanout: usize) -> Vec<Menu> {
    (1..=count)
        .map(|i| {
            let parent = (i > fanout).then(|| (i / fanout) as Id);
            Menu {
                id: i as Id,
                parent_id: parent,
                ..Menu::new(format!("menu-{}", i))
            }
        })
        .collect()
}

fn bench_build_forest(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_forest");

    for count in [100, 1_000, 10_000].iter() {
        let menus = wide_menus(*count, 8);
        group.bench_with_input(BenchmarkId::new("menus", count), &menus, |b, menus| {
            b.iter(|| build_forest(black_box(menus.clone())).unwrap());
        });
    }

    group.finish();
}

fn bench_ancestry(c: &mut Criterion) {
    let mut group = c.benchmark_group("ancestry_path");

    for count in [100, 1_000, 10_000].iter() {
        let hierarchy = Hierarchy::new(wide_menus(*count, 2)).unwrap();
        let deepest = *count as Id;
        group.bench_with_input(BenchmarkId::new("menus", count), &hierarchy, |b, h| {
            b.iter(|| h.ancestry_path(black_box(deepest)).unwrap().len());
        });
    }

    group.finish();
}

fn bench_visible_menus(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("visible_menus");

    for count in [50, 500].iter() {
        let (engine, user) = rt.block_on(async {
            let engine = AtlasEngine::new();
            let view = engine.permissions().create(Permission::new("VIEW")).await.unwrap();
            let edit = engine.permissions().create(Permission::new("EDIT")).await.unwrap();
            let role = engine.roles().create(Role::new("VIEWER")).await.unwrap();
            engine.roles().sync_permissions(role.id, &[view.id]).await.unwrap();
            let user = engine.users().create(User::new("bench")).await.unwrap();
            engine.users().assign_role(user.id, role.id).await.unwrap();

            let mut parents: Vec<Id> = Vec::new();
            for i in 0..*count {
                let mut menu = Menu::new(format!("menu-{}", i));
                if let Some(&parent) = parents.get(i / 4) {
                    menu = menu.with_parent(parent);
                }
                let menu = engine.menus().create(menu).await.unwrap();
                let required = if i % 3 == 0 { edit.id } else { view.id };
                engine.menus().add_permission(menu.id, required).await.unwrap();
                parents.push(menu.id);
            }
            (engine, user.id)
        });

        let engine = &engine;
        group.bench_with_input(BenchmarkId::new("menus", count), count, |b, _| {
            b.to_async(&rt)
                .iter(|| async move { engine.visible_menus(black_box(user)).await.unwrap() });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_forest, bench_ancestry, bench_visible_menus);
criterion_main!(benches);
