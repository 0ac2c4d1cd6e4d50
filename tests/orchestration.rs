//! Route bookkeeping under concurrent service events.

use std::sync::Arc;

use dynamic_gateway::config::EndpointTemplate;
use dynamic_gateway::routing::EndpointResolver;
use dynamic_gateway::{DynamicRouter, Gateway, Service, ServiceUid};

fn gateway(router: Arc<DynamicRouter>) -> Gateway {
    let templates = vec![
        EndpointTemplate {
            service_name: "users".into(),
            downstream_path: "/accounts/{id}".into(),
            upstream_path: "/v1/accounts/{id}".into(),
            ..Default::default()
        },
        EndpointTemplate {
            service_name: "users".into(),
            downstream_path: "/health".into(),
            upstream_path: "/healthz".into(),
            methods: vec!["GET".into()],
            ..Default::default()
        },
    ];
    Gateway::new(EndpointResolver::new(templates, "/api", ""), router)
}

fn users(uid: &str, port: u16) -> Service {
    Service::new(uid, format!("http://10.0.0.1:{}", port), "users", "default")
}

#[test]
fn test_concurrent_services_keep_table_and_router_in_step() {
    let router = Arc::new(DynamicRouter::new());
    let gateway = gateway(router.clone());

    std::thread::scope(|scope| {
        for i in 0..8u16 {
            let gateway = &gateway;
            scope.spawn(move || {
                let uid = format!("users-{}", i);
                let first = users(&uid, 8000 + i);
                let second = users(&uid, 9000 + i);
                for _ in 0..20 {
                    gateway.on_service_added(&first);
                    gateway.on_service_updated(&first, &second);
                    gateway.on_service_removed(&second);
                }
                gateway.on_service_added(&first);
            });
        }
    });

    assert_eq!(gateway.service_count(), 8);
    assert_eq!(router.len(), 16);
    for i in 0..8 {
        let ids = gateway.route_ids(&ServiceUid::from(format!("users-{}", i).as_str())).unwrap();
        assert_eq!(ids.len(), 2);
    }
}

#[test]
fn test_racing_removals_leave_no_orphans() {
    let router = Arc::new(DynamicRouter::new());
    let gateway = gateway(router.clone());
    let service = users("users-1", 8080);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..200 {
                gateway.on_service_added(&service);
                gateway.on_service_removed(&service);
            }
        });
        scope.spawn(|| {
            for _ in 0..200 {
                gateway.on_service_removed(&service);
            }
        });
    });

    assert_eq!(gateway.service_count(), 0);
    assert!(router.is_empty(), "orphaned routes: {:?}", router.patterns());
}
