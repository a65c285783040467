//! Generated Go sources for the build module.

use crate::host::HostApp;

/// Source of `embed.go`, written when directories are embedded into Caddy.
/// Contains a `{core_module}` placeholder.
pub const EMBED_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/embed.go.tmpl"));

/// Render `main.go`: blank-import the core command package and every
/// plugin, in the order given, and hand control to the core's entry point.
///
/// Plugins are emitted as passed; duplicates are not removed.
pub fn render_main(host: HostApp, core_module: &str, plugins: &[String]) -> String {
  let mut imports = String::new();
  for plugin in plugins {
    imports.push_str(&format!("\n\t_ \"{plugin}\""));
  }

  match host {
    HostApp::Caddy => format!(
      "package main\n\
       \n\
       import (\n\
       \tcaddycmd \"{core_module}/cmd\"\n\
       \n\
       \t// plug in Caddy modules here\n\
       \t_ \"{core_module}/modules/standard\"{imports}\n\
       )\n\
       \n\
       func main() {{\n\
       \tcaddycmd.Main()\n\
       }}\n"
    ),
    HostApp::K6 => format!(
      "package main\n\
       \n\
       import (\n\
       \tk6cmd \"{core_module}/cmd\"\n\
       \n\
       \t// plug in k6 extensions here{imports}\n\
       )\n\
       \n\
       func main() {{\n\
       \tk6cmd.Execute()\n\
       }}\n"
    ),
  }
}

/// Render `embed.go` for the given core module.
pub fn render_embed(core_module: &str) -> String {
  EMBED_TEMPLATE.replace("{core_module}", core_module)
}
