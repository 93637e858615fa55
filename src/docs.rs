//! Swagger UI page for the loaded API schema.

use anyhow::Context;
use minijinja::{context, Environment};

const TEMPLATE: &str = include_str!("../templates/swagger_ui.html");

/// Public CDN serving the Swagger UI assets.
pub const SWAGGER_UI_ASSETS: &str = "https://unpkg.com/swagger-ui-dist@5";

/// Path the raw schema is served under.
pub const SPEC_URL: &str = "/openapi.yaml";

/// Rendered Swagger UI page, built once at startup.
#[derive(Debug, Clone)]
pub struct SwaggerUi {
    html: String,
}

impl SwaggerUi {
    /// Render the page for an API called `title` whose schema lives at `spec_url`.
    pub fn render(title: &str, spec_url: &str) -> anyhow::Result<Self> {
        let mut env = Environment::new();
        env.add_template("swagger_ui.html", TEMPLATE)
            .context("swagger ui template does not parse")?;
        let html = env
            .get_template("swagger_ui.html")
            .and_then(|tpl| {
                tpl.render(context! {
                    title => title,
                    spec_url => spec_url,
                    assets_url => SWAGGER_UI_ASSETS,
                })
            })
            .context("rendering swagger ui")?;
        Ok(Self { html })
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}
