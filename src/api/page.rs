use axum::{
    extract::{ multipart::{ Multipart, MultipartRejection }, State },
    response::{ IntoResponse, Redirect, Response },
};
use maud::{ html, Markup, PreEscaped, DOCTYPE };
use tower_cookies::Cookies;

use crate::error::{ human_size, AppError, Result };

use super::{ flash, form, render_base64, AppState };

const CARD: &str =
    "rounded-2xl bg-white/70 dark:bg-neutral-800/70 border border-gray-200 dark:border-neutral-700 p-6 shadow-sm";

/// Everything the form page shows besides static markup.
#[derive(Debug, Default)]
pub struct PageView<'a> {
    pub flash: Option<&'a str>,
    pub url: &'a str,
    pub qrb64: Option<&'a str>,
    pub max_upload_bytes: usize,
}

pub fn render_page(view: &PageView<'_>) -> Markup {
    let max_size = human_size(view.max_upload_bytes);

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { "QR Code Generator" }
                link rel="icon" type="image/svg+xml" href="/static/logo.svg";
                script src="https://cdn.tailwindcss.com" {}
                meta name="color-scheme" content="light dark";
            }
            body class="min-h-screen bg-gray-50 text-gray-900 dark:bg-neutral-900 dark:text-neutral-100" {
                header class="py-6 flex flex-col items-center justify-center" {
                    img src="/static/logo.svg" alt="Logo" class="w-20 h-20 mb-3 rounded-full shadow";
                    h1 class="text-center text-3xl font-semibold" { "QR Code Generator" }
                    p class="mt-2 text-center text-sm text-gray-500 dark:text-neutral-400" {
                        "Enter a link and, optionally, a logo for the center of the code."
                    }
                }

                main class="max-w-3xl mx-auto px-4 pb-16" {
                    @if let Some(message) = view.flash {
                        div class="mb-6 rounded-xl border border-amber-300 bg-amber-50 px-4 py-3 text-amber-800 dark:border-amber-600 dark:bg-amber-950/40 dark:text-amber-200" {
                            (message)
                        }
                    }

                    div class="grid gap-6 md:grid-cols-2" {
                        form id="qr-form" method="POST" enctype="multipart/form-data" class=(CARD) {
                            label class="block text-sm font-medium mb-2" for="url" { "Link" }
                            input required type="url" id="url" name="url"
                                placeholder="https://example.com/my-link"
                                value=(view.url)
                                class="w-full rounded-xl border border-gray-300 dark:border-neutral-700 bg-white dark:bg-neutral-900 px-3 py-2 text-sm";

                            div class="mt-5" {
                                label class="block text-sm font-medium mb-2" for="logo" {
                                    "Logo (optional), PNG/JPG, square works best"
                                }
                                input type="file" id="logo" name="logo"
                                    accept="image/png, image/jpeg, image/jpg" class="w-full text-sm";
                                p class="mt-2 text-xs text-gray-500 dark:text-neutral-400" {
                                    "Maximum file size: " strong { (max_size) } "."
                                }
                            }

                            div class="mt-6 flex items-center gap-3" {
                                button type="submit"
                                    class="inline-flex items-center justify-center rounded-xl bg-indigo-600 px-4 py-2 text-white text-sm font-medium hover:bg-indigo-700" {
                                    "Generate QR code"
                                }
                                button type="submit" formmethod="get" formaction="/" formnovalidate
                                    class="rounded-xl border border-gray-300 dark:border-neutral-700 px-4 py-2 text-sm" {
                                    "Clear"
                                }
                            }
                        }

                        div class=(CARD) {
                            h2 class="text-lg font-semibold" { "Preview" }
                            @match view.qrb64 {
                                Some(qrb64) => {
                                    img src={ "data:image/png;base64," (qrb64) } alt="QR Code"
                                        class="mt-4 mx-auto w-full max-w-xs rounded-xl border border-gray-200 dark:border-neutral-700";
                                    a download="qrcode.png" href={ "data:image/png;base64," (qrb64) }
                                        class="mt-6 inline-flex w-full items-center justify-center rounded-xl bg-emerald-600 px-4 py-2 text-white text-sm font-medium hover:bg-emerald-700" {
                                        "Download PNG"
                                    }
                                }
                                None => {
                                    div class="mt-6 grid place-items-center h-56 rounded-xl border border-dashed border-gray-300 dark:border-neutral-700 text-sm text-gray-500 dark:text-neutral-400" {
                                        "The QR code will appear here once generated."
                                    }
                                }
                            }
                        }
                    }
                }

                // Only numbers are interpolated into the script.
                script {
                    (PreEscaped(format!(
                        "const form = document.getElementById('qr-form');\n\
                         const logoInput = document.getElementById('logo');\n\
                         form.addEventListener('submit', (e) => {{\n\
                           const f = logoInput.files && logoInput.files[0];\n\
                           if (f && f.size > {}) {{\n\
                             e.preventDefault();\n\
                             alert('The logo file exceeds {}.');\n\
                           }}\n\
                         }});",
                        view.max_upload_bytes,
                        max_size
                    )))
                }
            }
        }
    }
}

/// `GET /`: the empty form, plus whatever message the last redirect left.
pub async fn index(State(state): State<AppState>, cookies: Cookies) -> Markup {
    let message = flash::take(&cookies);

    render_page(
        &(PageView {
            flash: message.as_deref(),
            max_upload_bytes: state.config.max_upload_bytes,
            ..Default::default()
        })
    )
}

/// `POST /`: renders the page with the preview, or flashes the failure and
/// redirects back to the form.
pub async fn generate(
    State(state): State<AppState>,
    cookies: Cookies,
    multipart: std::result::Result<Multipart, MultipartRejection>
) -> Response {
    match generate_from_form(&state, multipart).await {
        Ok((url, qrb64)) =>
            render_page(
                &(PageView {
                    flash: None,
                    url: &url,
                    qrb64: Some(&qrb64),
                    max_upload_bytes: state.config.max_upload_bytes,
                })
            ).into_response(),
        Err(err) => {
            if err.is_server_error() {
                tracing::error!("Failed to generate QR code: {}", err);
            } else {
                tracing::debug!("Rejected form submission: {}", err);
            }

            flash::set(&cookies, &err.user_message());
            Redirect::to("/").into_response()
        }
    }
}

async fn generate_from_form(
    state: &AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>
) -> Result<(String, String)> {
    let multipart = multipart.map_err(|e| AppError::UnsupportedMediaType(e.body_text()))?;
    let request = form::read_qr_form(multipart, state.config.max_upload_bytes).await?;
    let url = request.url.clone();
    let qrb64 = render_base64(state, request).await?;

    Ok((url, qrb64))
}
