//! Central index rendering.

/// Export emitted by a category barrel with no units, so imports still resolve.
pub const PLACEHOLDER_EXPORT: &str = "export default {};";

/// Render one category barrel from its re-export lines.
pub fn render_category_index(lines: &[String]) -> String {
    if lines.is_empty() {
        return format!("{PLACEHOLDER_EXPORT}\n");
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Root index: client helpers bound to the durable-execution ingress.
///
/// Static content, independent of the registry.
pub const ROOT_INDEX: &str = r#"// This file is automatically generated by restate-gen.
// Do not edit this file directly.

import { api as _api } from "encore.dev/api";
import type { IncomingMessage, ServerResponse } from "node:http";
import * as clients from "@restatedev/restate-sdk-clients";
import type {
  Service,
  VirtualObject,
  ServiceDefinitionFrom,
  VirtualObjectDefinitionFrom,
  WorkflowDefinitionFrom,
  Workflow,
} from "@restatedev/restate-sdk-core";
export * as services from "~restate/services";
export * as workflows from "~restate/workflows";
export * as objects from "~restate/objects";

let cachedClient: ReturnType<typeof clients.connect> | undefined;
export const getClient = () => {
  if (!cachedClient) {
    cachedClient = clients.connect({ url: process.env.RESTATE_SERVER_URL ?? "http://localhost:8080" });
  }
  return cachedClient;
};

export const serviceClient = <D>(svc: ServiceDefinitionFrom<D>): clients.IngressClient<Service<D>> =>
  getClient().serviceClient(svc);

export const objectClient = <D>(obj: VirtualObjectDefinitionFrom<D>, key: string): clients.IngressClient<VirtualObject<D>> =>
  getClient().objectClient(obj, key);

export const serviceSendClient = <D>(svc: ServiceDefinitionFrom<D>): clients.IngressSendClient<Service<D>> =>
  getClient().serviceSendClient(svc);

export const objectSendClient = <D>(obj: VirtualObjectDefinitionFrom<D>, key: string): clients.IngressSendClient<VirtualObject<D>> =>
  getClient().objectSendClient(obj, key);

export const workflowClient = <D>(wf: WorkflowDefinitionFrom<D>, key: string): clients.IngressWorkflowClient<Workflow<D>> =>
  getClient().workflowClient(wf, key);

export function buildEncoreRestateHandler(fetch: (request: Request, ...extraArgs: unknown[]) => Promise<Response>) {
  return (req: IncomingMessage, resp: ServerResponse<IncomingMessage>) => {
    readBody(req)
      .then(async body => {
        const url = "http://" + (req.headers.host ?? "localhost") + req.url;
        const request = new Request(url, {
          method: req.method ?? "GET",
          headers: req.headers as Record<string, string>,
          body: ["GET", "HEAD"].includes(req.method || "") ? undefined : body,
        });
        return fetch(request);
      })
      .then(restateResponse => {
        resp.writeHead(
          restateResponse.status,
          Object.fromEntries(restateResponse.headers.entries()),
        );
        if (!restateResponse.body) {
          resp.end();
          return;
        }
        return restateResponse.body.getReader();
      })
      .then(reader => {
        if (!reader) return;
        const pump = (): Promise<void> => reader.read()
          .then(({ done, value }) => {
            if (done) {
              resp.end();
              return;
            }
            resp.write(value);
            return pump();
          });
        return pump();
      })
      .catch(err => {
        console.error(err);
        resp.writeHead(500, { "Content-Type": "text/plain" });
        resp.end(String(err));
      });
  };
}

function readBody(req: IncomingMessage): Promise<Buffer> {
  return new Promise((resolve, reject) => {
    const chunks: Buffer[] = [];
    req.on("data", (chunk) => chunks.push(chunk));
    req.on("end", () => resolve(Buffer.concat(chunks)));
    req.on("error", (err) => reject(err));
  });
}
"#;
