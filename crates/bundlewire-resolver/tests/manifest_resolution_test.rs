/// Integration tests resolving modules described by manifest headers
///
/// Manifests are read from JSON the same way the command line tool reads
/// them, then installed into a started resolver.

use bundlewire_resolver::{
    BundleManifest, Generation, Resolver, ResolverConfig, ResolverError,
    StaticFramework, State,
};
use std::sync::Arc;

struct Framework {
    resolver: Resolver,
    generations: Vec<Arc<Generation>>,
}

impl Framework {
    fn start(config: &ResolverConfig) -> Self {
        let resolver = Resolver::from_config(config);
        resolver
            .start(Arc::new(StaticFramework::from_config(config)))
            .unwrap();
        Self {
            resolver,
            generations: Vec::new(),
        }
    }

    fn install(&mut self, headers: &str) -> Arc<Generation> {
        let manifest: BundleManifest = serde_json::from_str(headers).unwrap();
        let generation = Generation::new(self.generations.len() as u64 + 1, 0, Arc::new(manifest));
        self.resolver.added(generation.clone()).unwrap();
        self.generations.push(generation.clone());
        generation
    }

    fn resolve_and_apply(&self, generation: &Arc<Generation>) -> Result<(), ResolverError> {
        for solution in self.resolver.resolve(generation)? {
            solution.apply();
        }
        Ok(())
    }
}

#[test]
fn test_resolve_from_headers() {
    let mut framework = Framework::start(&ResolverConfig::default());
    let log = framework.install(
        r#"{
            "Bundle-SymbolicName": "org.acme.log",
            "Bundle-Version": "1.4.0",
            "Export-Package": "org.acme.log;version=1.4.0, org.acme.log.spi;version=1.4.0;uses:=\"org.acme.log\""
        }"#,
    );
    let app = framework.install(
        r#"{
            "Bundle-SymbolicName": "org.acme.app",
            "Bundle-Version": "2.0.0",
            "Import-Package": "org.acme.log;version=\"[1.0,2.0)\", java.util, org.acme.metrics;resolution:=optional"
        }"#,
    );

    framework.resolve_and_apply(&app).unwrap();

    assert_eq!(app.state(), State::Resolved);
    assert_eq!(log.state(), State::Resolved);
    let wires = app.wires();
    assert_eq!(wires.len(), 1);
    assert_eq!(wires[0].package_name, "org.acme.log");
    assert!(Arc::ptr_eq(&wires[0].exporter, &log));
}

#[test]
fn test_version_range_excludes_exporter() {
    let mut framework = Framework::start(&ResolverConfig::default());
    framework.install(r#"{"Bundle-SymbolicName": "lib", "Export-Package": "org.lib;version=3.0"}"#);
    let app = framework.install(r#"{"Bundle-SymbolicName": "app", "Import-Package": "org.lib;version=\"[1,2)\""}"#);

    let err = framework.resolve_and_apply(&app).unwrap_err();
    assert!(matches!(err, ResolverError::NoSolution { .. }));
    assert_eq!(app.state(), State::Installed);
}

#[test]
fn test_fragment_and_require_bundle_from_headers() {
    let mut framework = Framework::start(&ResolverConfig::default());
    let core = framework.install(
        r#"{"Bundle-SymbolicName": "acme.core;singleton:=true", "Bundle-Version": "1.0", "Export-Package": "acme.core"}"#,
    );
    let ui = framework.install(
        r#"{"Bundle-SymbolicName": "acme.ui", "Require-Bundle": "acme.core;bundle-version=\"[1.0,2.0)\";visibility:=reexport"}"#,
    );
    let nl = framework.install(
        r#"{"Bundle-SymbolicName": "acme.ui.nl", "Fragment-Host": "acme.ui", "Export-Package": "acme.ui.nl"}"#,
    );

    framework.resolve_and_apply(&ui).unwrap();

    assert_eq!(core.state(), State::Resolved);
    assert_eq!(nl.state(), State::Resolved);
    assert_eq!(ui.fragments().len(), 1);

    let required = ui.required_bundle_wires();
    assert_eq!(required.len(), 1);
    assert!(required[0].reexport);
    assert!(Arc::ptr_eq(&required[0].exporter, &core));
}

#[test]
fn test_prefer_lowest_from_config() {
    let config = ResolverConfig {
        prefer_lowest: true,
        ..ResolverConfig::default()
    };
    let mut framework = Framework::start(&config);
    let old = framework.install(r#"{"Bundle-SymbolicName": "lib", "Bundle-Version": "1.0", "Export-Package": "org.lib;version=1.0"}"#);
    framework.install(r#"{"Bundle-SymbolicName": "lib", "Bundle-Version": "2.0", "Export-Package": "org.lib;version=2.0"}"#);
    let app = framework.install(r#"{"Bundle-SymbolicName": "app", "Import-Package": "org.lib"}"#);

    framework.resolve_and_apply(&app).unwrap();
    assert!(Arc::ptr_eq(&app.wires()[0].exporter, &old));
}

#[test]
fn test_dynamic_import_from_headers() {
    let mut framework = Framework::start(&ResolverConfig::default());
    let host = framework.install(
        r#"{"Bundle-SymbolicName": "host", "DynamicImport-Package": "org.plugins.*"}"#,
    );
    framework.resolve_and_apply(&host).unwrap();
    let plugin = framework.install(r#"{"Bundle-SymbolicName": "plugin", "Export-Package": "org.plugins.csv"}"#);

    let dynamic = host.archive_store().dynamic_import_descriptions()[0].clone();
    for solution in framework.resolver.resolve_dynamic(&host, &dynamic).unwrap() {
        solution.apply();
    }

    assert!(Arc::ptr_eq(&host.wires()[0].exporter, &plugin));
    assert_eq!(plugin.state(), State::Resolved);
}

#[test]
fn test_malformed_manifest_rejected() {
    let result: Result<BundleManifest, _> =
        serde_json::from_str(r#"{"Bundle-SymbolicName": "app", "Import-Package": "a;version=1.0;specification-version=2.0"}"#);
    assert!(result.is_err());
}
