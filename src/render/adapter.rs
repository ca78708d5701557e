//! Per-unit adapter rendering.
//!
//! Layout of a generated adapter:
//!
//! ```text
//! header
//! one import per (category, source file)
//! runtime imports
//! one restate construct per non-empty category
//! endpoint binding + shared handler
//! one routed entry point per handler
//! discovery entry point
//! typed name stubs
//! ```

use crate::types::{HandlerCategory, TemplateData};

use super::GENERATED_HEADER;
use super::writer::CodeWriter;

/// Render the adapter file for one unit.
pub fn render_adapter(data: &TemplateData) -> String {
    let mut w = CodeWriter::new();
    for line in GENERATED_HEADER {
        w.line(line);
    }
    w.blank();

    let categories: Vec<HandlerCategory> = HandlerCategory::GENERATED
        .into_iter()
        .filter(|c| !data.group(*c).is_empty())
        .collect();

    for category in &categories {
        for group in data.group(*category) {
            let names = group
                .handlers
                .iter()
                .map(|h| format!("{0} as __{0}", h.export_name))
                .collect::<Vec<_>>()
                .join(", ");
            w.line(&format!("import {{ {names} }} from \"{}\";", group.source));
        }
        w.blank();
    }

    w.line("import { api } from \"encore.dev/api\";");
    w.line("import { endpoint } from \"@restatedev/restate-sdk/fetch\";");
    w.line("import * as restate from \"@restatedev/restate-sdk\";");
    w.line("import { buildEncoreRestateHandler } from \"~restate\";");
    w.blank();

    for category in &categories {
        let construct = data.construct_name(*category);
        w.block(
            &format!(
                "export const _{construct} = restate.{}({{",
                category.sdk_factory()
            ),
            "});",
            |w| {
                w.line(&format!("name: \"{construct}\","));
                w.block("handlers: {", "},", |w| {
                    for group in data.group(*category) {
                        for h in &group.handlers {
                            w.line(&format!("{0}: __{0},", h.export_name));
                        }
                    }
                });
            },
        );
        w.blank();
    }

    w.line("const restateEndpoint = endpoint();");
    for category in &categories {
        w.line(&format!(
            "restateEndpoint.bind(_{});",
            data.construct_name(*category)
        ));
    }
    w.blank();
    w.line("export const handler = buildEncoreRestateHandler(restateEndpoint.handler().fetch);");
    w.blank();

    for category in &categories {
        let construct = data.construct_name(*category);
        for group in data.group(*category) {
            for h in &group.handlers {
                let path = format!(
                    "/{}/invoke/{construct}/{}",
                    data.service_name, h.export_name
                );
                routed_entry(&mut w, &h.export_name, &path, "POST");
            }
        }
    }
    routed_entry(
        &mut w,
        "discover",
        &format!("/{}/discover", data.service_name),
        "GET",
    );

    for category in &categories {
        let construct = data.construct_name(*category);
        w.block(
            &format!("export const {construct}: typeof _{construct} = {{"),
            "};",
            |w| {
                w.line(&format!("name: \"{construct}\","));
            },
        );
        w.blank();
    }

    w.build()
}

fn routed_entry(w: &mut CodeWriter, export: &str, path: &str, method: &str) {
    w.block(&format!("export const {export} = api.raw("), ");", |w| {
        w.line(&format!(
            "{{ expose: false, path: \"{path}\", method: \"{method}\" }},"
        ));
        w.line("handler,");
    });
    w.blank();
}
