//! Server rendered pages.

use plant_serve::{species_path, ScoredLabel, SpeciesRecord};

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;padding:0 1rem}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.3rem .6rem}\
.error{color:red}.fotos img{max-width:45%;margin:.3rem}\
.barra{background:#eee;height:.8rem}#barra-llena{background:#4a4;height:100%;width:0}\
.info-extra{display:none}.info-extra.mostrar{display:block}";

/// Escape text for use in element content and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"es\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        STYLE,
        body
    )
}

pub fn index_page() -> String {
    page(
        "Identificador de plantas",
        "<h1>Identificador de plantas</h1>\n\
         <form action=\"/predict\" method=\"post\" enctype=\"multipart/form-data\">\n\
         <input type=\"file\" name=\"file\" accept=\"image/*\" required>\n\
         <button type=\"submit\">Identificar</button>\n\
         </form>\n\
         <p><a href=\"/navegacion\">Menú</a></p>",
    )
}

pub fn navigation_page() -> String {
    page(
        "Jardín",
        "<h1>Jardín</h1>\n<ul>\n\
         <li><a href=\"/pagina_juego\">Juego: encuentra las plantas</a></li>\n\
         <li><a href=\"/\">Identificar una foto</a></li>\n\
         </ul>",
    )
}

/// Host page of the species game. `/static/script.js` fills the species
/// list from `/api/plantas`, checks photos against `/api/analizar_foto` and
/// tracks progress through the Firebase client, which the deployment
/// configures in `/static/firebase-init.js`.
pub fn game_page() -> String {
    page(
        "Juego",
        "<h1 id=\"titulo-nivel\">El Primer Brote</h1>\n\
         <p id=\"contador-progreso\"></p>\n\
         <div class=\"barra\"><div id=\"barra-llena\"></div></div>\n\
         <div id=\"listaPlantas\"></div>\n\
         <p><a href=\"/navegacion\">Volver</a></p>\n\
         <script src=\"https://www.gstatic.com/firebasejs/9.23.0/firebase-app-compat.js\"></script>\n\
         <script src=\"https://www.gstatic.com/firebasejs/9.23.0/firebase-auth-compat.js\"></script>\n\
         <script src=\"https://www.gstatic.com/firebasejs/9.23.0/firebase-firestore-compat.js\"></script>\n\
         <script src=\"/static/firebase-init.js\"></script>\n\
         <script src=\"/static/script.js\"></script>",
    )
}

pub fn error_page(message: &str) -> String {
    page(
        "Error",
        &format!("<h2 class=\"error\">Error: {}</h2>", escape(message)),
    )
}

/// Top predictions with their taxonomy. Labels without a full breakdown
/// show dashes in the rank columns.
pub fn predictions_page(predictions: &[ScoredLabel]) -> String {
    let mut rows = String::new();
    for prediction in predictions {
        let name = prediction.scientific_name();
        let taxon = prediction.taxon();
        let cell = |value: Option<&String>| value.map(|v| escape(v)).unwrap_or_else(|| "-".to_owned());

        rows.push_str(&format!(
            "<tr><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.2}%</td></tr>\n",
            escape(&species_path(&name)),
            escape(&name),
            cell(taxon.as_ref().map(|t| &t.kingdom)),
            cell(taxon.as_ref().map(|t| &t.phylum)),
            cell(taxon.as_ref().map(|t| &t.class)),
            cell(taxon.as_ref().map(|t| &t.order)),
            cell(taxon.as_ref().map(|t| &t.family)),
            cell(taxon.as_ref().map(|t| &t.genus)),
            cell(taxon.as_ref().map(|t| &t.species)),
            prediction.probability as f64 * 100.0,
        ));
    }

    page(
        "Resultados",
        &format!(
            "<h1>Resultados</h1>\n<table>\n<tr><th>Nombre científico</th><th>Reino</th>\
             <th>Filo</th><th>Clase</th><th>Orden</th><th>Familia</th><th>Género</th>\
             <th>Especie</th><th>Probabilidad</th></tr>\n{}</table>\n<p><a href=\"/\">Otra foto</a></p>",
            rows
        ),
    )
}

pub fn species_page(name: &str, record: &SpeciesRecord) -> String {
    let mut body = format!("<h1><em>{}</em></h1>\n", escape(name));

    if let Some(description) = &record.description {
        body.push_str(&format!("<p><strong>Características:</strong> {}</p>\n", escape(description)));
    }
    if let Some(details) = &record.other_details {
        body.push_str(&format!("<p><strong>Ubicación:</strong> {}</p>\n", escape(details)));
    }
    for (key, value) in &record.extra {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        body.push_str(&format!("<p><strong>{}:</strong> {}</p>\n", escape(key), escape(&text)));
    }

    if !record.photos.is_empty() {
        body.push_str("<div class=\"fotos\">\n");
        for (i, photo) in record.photos.iter().enumerate() {
            body.push_str(&format!(
                "<img src=\"{}\" alt=\"Foto {} de {}\">\n",
                escape(photo),
                i + 1,
                escape(name)
            ));
        }
        body.push_str("</div>\n");
    }

    page(name, &body)
}

/// Plain text answer for a species without metadata.
pub fn species_not_found(name: &str) -> String {
    format!("Lo sentimos, aún no tenemos información sobre {}", name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn short_labels_render_dashes() {
        let html = predictions_page(&[ScoredLabel {
            index: 0,
            label: "Rosa_canina".to_owned(),
            probability: 0.5,
        }]);

        assert!(html.contains("<a href=\"/planta/Rosa%20canina\">Rosa canina</a>"));
        assert!(html.contains("<td>-</td>"));
        assert!(html.contains("50.00%"));
    }

    #[test]
    fn prediction_links_encode_the_whole_name() {
        let html = predictions_page(&[ScoredLabel {
            index: 0,
            label: "Rosa_a/b#c".to_owned(),
            probability: 1.0,
        }]);

        assert!(html.contains("<a href=\"/planta/Rosa%20a%2Fb%23c\">"));
    }

    #[test]
    fn game_page_hosts_the_script() {
        let html = game_page();

        assert!(html.contains("<script src=\"/static/script.js\"></script>"));
        assert!(html.contains("id=\"listaPlantas\""));
        assert!(html.contains("id=\"barra-llena\""));
        assert!(navigation_page().contains("href=\"/pagina_juego\""));
    }

    #[test]
    fn species_page_lists_photos_and_escapes_text() {
        let record = SpeciesRecord {
            description: Some("<b>thorny</b>".to_owned()),
            photos: vec!["https://storage.googleapis.com/b/a.jpg".to_owned()],
            ..Default::default()
        };

        let html = species_page("rosa canina", &record);
        assert!(html.contains("&lt;b&gt;thorny&lt;/b&gt;"));
        assert!(html.contains("<img src=\"https://storage.googleapis.com/b/a.jpg\""));
    }
}
