//! Image classifier: a fixed network plus the label table it was trained on.

use std::path::Path;
use std::str::FromStr;

use image::imageops::FilterType;
use image::DynamicImage;
use log::info;
use serde::Serialize;
use tensorflow::{Graph, ImportGraphDefOptions, Session, SessionOptions, SessionRunArgs, Tensor};

use crate::error::{Error, Result};
use crate::labels::{Label, Taxon};
use crate::Timer;

/// Side of the square input image.
pub const INPUT_SIZE: u32 = 224;

const CHANNELS: usize = 3;
const CHANNEL_MEAN: [f32; CHANNELS] = [0.5, 0.5, 0.5];
const CHANNEL_SCALE: [f32; CHANNELS] = [0.5, 0.5, 0.5];

/// Memory order of the input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[1, 3, H, W]`, the order of networks exported from PyTorch
    Nchw,
    /// `[1, H, W, 3]`, the TensorFlow default
    Nhwc,
}

impl TensorLayout {
    fn dims(self) -> [u64; 4] {
        let side = INPUT_SIZE as u64;
        match self {
            TensorLayout::Nchw => [1, CHANNELS as u64, side, side],
            TensorLayout::Nhwc => [1, side, side, CHANNELS as u64],
        }
    }
}

impl FromStr for TensorLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nchw" => Ok(TensorLayout::Nchw),
            "nhwc" => Ok(TensorLayout::Nhwc),
            other => Err(format!("unknown tensor layout '{}', expected nchw or nhwc", other)),
        }
    }
}

/// One forward pass from a normalized image tensor to raw class scores.
pub trait Model: Send + Sync {
    fn layout(&self) -> TensorLayout;

    fn forward(&self, input: &[f32]) -> Result<Vec<f32>>;
}

/// Frozen TensorFlow graph executed in its own session.
pub struct TfModel {
    /// TensorFlow model graph
    graph: Graph,

    /// TensorFlow session
    session: Session,

    input_op: String,
    output_op: String,
    layout: TensorLayout,
}

impl TfModel {
    pub fn load(path: &Path, input_op: &str, output_op: &str, layout: TensorLayout) -> Result<Self> {
        let mut t = Timer::start("Loading graph");

        let proto = std::fs::read(path)
            .map_err(|e| Error::AssetMissing(format!("{}: {}", path.display(), e)))?;

        let mut graph = Graph::new();
        graph.import_graph_def(&proto, &ImportGraphDefOptions::new())?;
        let session = Session::new(&SessionOptions::new(), &graph)?;

        // Fail at startup rather than on the first request
        graph.operation_by_name_required(input_op)?;
        graph.operation_by_name_required(output_op)?;

        t.stop();

        Ok(TfModel {
            graph,
            session,
            input_op: input_op.to_owned(),
            output_op: output_op.to_owned(),
            layout,
        })
    }
}

impl Model for TfModel {
    fn layout(&self) -> TensorLayout {
        self.layout
    }

    fn forward(&self, input: &[f32]) -> Result<Vec<f32>> {
        let input = Tensor::new(&self.layout.dims()).with_values(input)?;

        let mut args = SessionRunArgs::new();
        args.add_feed(&self.graph.operation_by_name_required(&self.input_op)?, 0, &input);
        let result = args.request_fetch(&self.graph.operation_by_name_required(&self.output_op)?, 0);

        self.session.run(&mut args)?;
        let output: Tensor<f32> = args.fetch(result)?;

        Ok(output.to_vec())
    }
}

/// Milliseconds spent in each stage of one classification.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Timings {
    /// Time spent decoding the uploaded bytes
    pub image_load: i64,

    /// Time resizing and normalizing the image
    pub image_resize: i64,

    /// Time spent on the forward pass
    pub session_run: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredLabel {
    /// Position in the label table
    pub index: usize,
    pub label: String,
    pub probability: f32,
}

impl ScoredLabel {
    pub fn scientific_name(&self) -> String {
        Label::parse(&self.label).scientific_name()
    }

    pub fn taxon(&self) -> Option<Taxon> {
        Label::parse(&self.label).taxon()
    }

    /// Probability as a percentage rounded to two decimals
    pub fn confidence_percent(&self) -> f64 {
        (self.probability as f64 * 10_000.0).round() / 100.0
    }
}

/// Every label ordered by descending probability. Equal probabilities keep
/// label table order.
#[derive(Debug, Clone, Serialize)]
pub struct Ranking {
    entries: Vec<ScoredLabel>,
    pub timings: Timings,
}

impl Ranking {
    fn new(labels: &[String], probabilities: &[f32]) -> Self {
        let mut entries: Vec<ScoredLabel> = labels
            .iter()
            .zip(probabilities)
            .enumerate()
            .map(|(index, (label, &probability))| ScoredLabel {
                index,
                label: label.clone(),
                probability,
            })
            .collect();

        // sort_by is stable
        entries.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        Ranking {
            entries,
            timings: Timings::default(),
        }
    }

    pub fn best(&self) -> Option<&ScoredLabel> {
        self.entries.first()
    }

    pub fn top(&self, n: usize) -> &[ScoredLabel] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn entries(&self) -> &[ScoredLabel] {
        &self.entries
    }

    pub fn total_probability(&self) -> f32 {
        self.entries.iter().map(|e| e.probability).sum()
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    exps.into_iter().map(|x| x / sum).collect()
}

/// Resize to the network input and normalize every channel.
pub fn preprocess(image: &DynamicImage, layout: TensorLayout) -> Vec<f32> {
    let rgb = image.to_rgb8();
    let resized = image::imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let plane = (INPUT_SIZE * INPUT_SIZE) as usize;
    let mut tensor = vec![0f32; CHANNELS * plane];

    for (i, pixel) in resized.pixels().enumerate() {
        for c in 0..CHANNELS {
            let value = (pixel[c] as f32 / 255f32 - CHANNEL_MEAN[c]) / CHANNEL_SCALE[c];
            let at = match layout {
                TensorLayout::Nchw => c * plane + i,
                TensorLayout::Nhwc => i * CHANNELS + c,
            };
            tensor[at] = value;
        }
    }

    tensor
}

/// Read the label table: one label per line, blank lines ignored.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::AssetMissing(format!("{}: {}", path.display(), e)))?;

    let labels: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect();

    if labels.is_empty() {
        return Err(Error::AssetMissing(format!("{} holds no labels", path.display())));
    }

    Ok(labels)
}

pub struct Classifier {
    model: Box<dyn Model>,
    labels: Vec<String>,
}

impl Classifier {
    pub fn new(model: Box<dyn Model>, labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::AssetMissing("label table is empty".to_owned()));
        }

        Ok(Classifier { model, labels })
    }

    /// Load a frozen graph and its label table from disk.
    pub fn load(
        model_path: &Path,
        labels_path: &Path,
        input_op: &str,
        output_op: &str,
        layout: TensorLayout,
    ) -> Result<Self> {
        let labels = load_labels(labels_path)?;
        let model = TfModel::load(model_path, input_op, output_op, layout)?;
        info!("Loaded classifier with {} labels", labels.len());

        Self::new(Box::new(model), labels)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn classify(&self, image: &DynamicImage) -> Result<Ranking> {
        let mut t = Timer::start("Resizing image");
        let input = preprocess(image, self.model.layout());
        let image_resize = t.stop();

        let mut t = Timer::start("Running session");
        let logits = self.model.forward(&input)?;
        let session_run = t.stop();

        if logits.len() != self.labels.len() {
            return Err(Error::InferenceFailed(format!(
                "model produced {} scores for {} labels",
                logits.len(),
                self.labels.len()
            )));
        }

        let mut ranking = Ranking::new(&self.labels, &softmax(&logits));
        ranking.timings.image_resize = image_resize;
        ranking.timings.session_run = session_run;

        Ok(ranking)
    }

    pub fn classify_bytes(&self, data: &[u8]) -> Result<Ranking> {
        let mut t = Timer::start("Load image from memory");
        let image = image::load_from_memory(data)
            .map_err(|e| Error::BadInput(format!("could not decode image: {}", e)))?;
        let image_load = t.stop();

        let mut ranking = self.classify(&image)?;
        ranking.timings.image_load = image_load;

        Ok(ranking)
    }
}
