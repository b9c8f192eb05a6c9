//! Shared fixtures for integration tests
#![allow(dead_code)]

use atlas_authz::{AtlasEngine, EngineConfig};
use atlas_core::types::{Id, Menu, Permission, Role, User};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` overrides the default level
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Two roles, one viewer, and a two-level menu gated by permissions
///
/// ```text
/// ADMIN  -> MENUS_VER, MENUS_CREAR
/// VIEWER -> MENUS_VER
/// u1     -> VIEWER
/// menu 1 (requires MENUS_VER)
/// └── menu 2 (requires MENUS_CREAR)
/// ```
pub struct Scenario {
    pub engine: AtlasEngine,
    pub menus_ver: Id,
    pub menus_crear: Id,
    pub admin: Id,
    pub viewer: Id,
    pub u1: Id,
    pub root_menu: Id,
    pub child_menu: Id,
}

pub async fn example_scenario() -> Scenario {
    example_scenario_with(EngineConfig::default()).await
}

pub async fn example_scenario_with(config: EngineConfig) -> Scenario {
    init_tracing();
    let engine = AtlasEngine::with_config(config);

    let menus_ver = engine.permissions().create(Permission::new("MENUS_VER")).await.unwrap().id;
    let menus_crear = engine.permissions().create(Permission::new("MENUS_CREAR")).await.unwrap().id;

    let admin = engine.roles().create(Role::new("ADMIN")).await.unwrap().id;
    let viewer = engine.roles().create(Role::new("VIEWER")).await.unwrap().id;
    engine.roles().sync_permissions(admin, &[menus_ver, menus_crear]).await.unwrap();
    engine.roles().sync_permissions(viewer, &[menus_ver]).await.unwrap();

    let u1 = engine.users().create(User::new("u1")).await.unwrap().id;
    engine.users().sync_roles(u1, &[viewer]).await.unwrap();

    let root_menu = engine.menus().create(Menu::new("Menus")).await.unwrap().id;
    let child_menu = engine
        .menus()
        .create(Menu::new("Create menu").with_parent(root_menu))
        .await
        .unwrap()
        .id;
    engine.menus().sync_permissions(root_menu, &[menus_ver]).await.unwrap();
    engine.menus().sync_permissions(child_menu, &[menus_crear]).await.unwrap();

    Scenario {
        engine,
        menus_ver,
        menus_crear,
        admin,
        viewer,
        u1,
        root_menu,
        child_menu,
    }
}

/// Create a user holding the given roles
pub async fn user_with_roles(engine: &AtlasEngine, username: &str, roles: &[Id]) -> Id {
    let id = engine.users().create(User::new(username)).await.unwrap().id;
    engine.users().sync_roles(id, roles).await.unwrap();
    id
}
