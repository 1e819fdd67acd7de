use std::error::Error;
use std::path::PathBuf;

use log::info;
use plant_serve::{Classifier, Ranking, ScoredLabel, TensorLayout, Taxon};
use serde::Serialize;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "plant-classify",
    about = "CLI app to identify the plant species in one photo"
)]
struct CmdArgs {
    #[structopt(help = "Frozen TensorFlow graph of the classifier", parse(from_os_str))]
    model_path: PathBuf,

    #[structopt(help = "Label table, one label per line", parse(from_os_str))]
    labels_path: PathBuf,

    #[structopt(help = "Image file or http(s) URL to classify")]
    image: String,

    #[structopt(long, default_value = "3", help = "Number of predictions to print")]
    top: usize,

    #[structopt(long, default_value = "input")]
    input_op: String,

    #[structopt(long, default_value = "output")]
    output_op: String,

    #[structopt(long, default_value = "nchw", help = "Input tensor layout: nchw or nhwc")]
    layout: TensorLayout,
}

#[derive(Serialize)]
struct Prediction {
    scientific_name: String,
    probability: f64,
    #[serde(flatten)]
    taxon: Option<Taxon>,
}

impl From<&ScoredLabel> for Prediction {
    fn from(scored: &ScoredLabel) -> Self {
        Prediction {
            scientific_name: scored.scientific_name(),
            probability: scored.confidence_percent(),
            taxon: scored.taxon(),
        }
    }
}

#[derive(Serialize)]
struct Report<'a> {
    predictions: Vec<Prediction>,
    timings: &'a plant_serve::classifier::Timings,
}

async fn read_image(source: &str) -> Result<Vec<u8>, Box<dyn Error>> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("Fetching image from {}", source);
        let resp = reqwest::get(source).await?.error_for_status()?;
        Ok(resp.bytes().await?.to_vec())
    } else {
        Ok(tokio::fs::read(source).await?)
    }
}

fn report(ranking: &Ranking, top: usize) -> Report<'_> {
    Report {
        predictions: ranking.top(top).iter().map(Prediction::from).collect(),
        timings: &ranking.timings,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = CmdArgs::from_args();

    let classifier = Classifier::load(
        &args.model_path,
        &args.labels_path,
        &args.input_op,
        &args.output_op,
        args.layout,
    )?;

    let data = read_image(&args.image).await?;
    let ranking = classifier.classify_bytes(&data)?;

    println!("{}", serde_json::to_string_pretty(&report(&ranking, args.top))?);

    Ok(())
}
