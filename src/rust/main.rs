use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use cardiorisk::{
    AppConfig, Feature, FormInputs, FormSession, Gender, InferenceHandler, Level, PredictionResult,
    RiskLabel,
};
use clap::Parser;
use log::info;

const PROGRESS_WIDTH: usize = 50;

const DISCLAIMER: &str = "Disclaimer: this prediction comes from a machine learning model and does not \
replace a professional medical diagnosis. Consult a doctor for an accurate health assessment.";

#[derive(Parser)]
#[command(author, version, about = "Cardiovascular risk prediction", long_about = None)]
struct Args {
    /// Path to the ONNX model (defaults to $CARDIORISK_MODEL, then ./best_gradient_boosting_model.onnx, then the cache dir)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Expected SHA-256 of the model file
    #[arg(long)]
    sha256: Option<String>,

    /// ONNX Runtime intra-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    intra_threads: usize,

    /// ONNX Runtime inter-op threads (0 lets the runtime decide)
    #[arg(long, default_value_t = 0)]
    inter_threads: usize,

    /// Read the form as JSON from a file ('-' for stdin) instead of the flags below
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    form: FormArgs,
}

#[derive(clap::Args)]
struct FormArgs {
    /// Age in years
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(25..=70))]
    age: u32,

    /// 1 = male, 2 = female
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    gender: u8,

    /// Height in centimeters
    #[arg(long, default_value_t = 165.0, value_parser = parse_height)]
    height: f32,

    /// Weight in kilograms
    #[arg(long, default_value_t = 70.0, value_parser = parse_weight)]
    weight: f32,

    /// Body mass index
    #[arg(long, default_value_t = 25.0, value_parser = parse_bmi)]
    bmi: f32,

    /// Systolic blood pressure
    #[arg(long, default_value_t = 120, value_parser = clap::value_parser!(u32).range(60..=240))]
    ap_hi: u32,

    /// Diastolic blood pressure
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u32).range(40..=180))]
    ap_lo: u32,

    /// Cholesterol: 1 normal, 2 above normal, 3 well above normal
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    cholesterol: u8,

    /// Glucose: 1 normal, 2 above normal, 3 well above normal
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=3))]
    gluc: u8,

    /// Smoker
    #[arg(long)]
    smoke: bool,

    /// Drinks alcohol
    #[arg(long)]
    alco: bool,

    /// Physically active
    #[arg(long)]
    active: bool,
}

fn parse_height(raw: &str) -> Result<f32, String> {
    Feature::Height.spec().parse(raw)
}

fn parse_weight(raw: &str) -> Result<f32, String> {
    Feature::Weight.spec().parse(raw)
}

fn parse_bmi(raw: &str) -> Result<f32, String> {
    Feature::Bmi.spec().parse(raw)
}

impl FormArgs {
    fn to_inputs(&self) -> Result<FormInputs> {
        Ok(FormInputs {
            age_years: self.age,
            gender: Gender::try_from(self.gender)?,
            height_cm: self.height,
            weight_kg: self.weight,
            ap_hi: self.ap_hi,
            ap_lo: self.ap_lo,
            cholesterol: Level::try_from(self.cholesterol)?,
            glucose: Level::try_from(self.gluc)?,
            smoker: self.smoke,
            alcohol: self.alco,
            active: self.active,
            bmi: self.bmi,
        })
    }
}

fn read_form(args: &Args) -> Result<FormInputs> {
    let Some(path) = &args.input else {
        return args.form.to_inputs();
    };

    let json = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf).context("Failed to read form from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read form {:?}", path))?
    };
    Ok(FormInputs::from_json(&json)?)
}

fn render(result: &PredictionResult) {
    println!("Prediction: {}", result.label);
    println!("Probability of high risk: {:.2} %", result.probability_percent);

    let filled = usize::from(result.progress()) * PROGRESS_WIDTH / 100;
    let fill = if result.label == RiskLabel::HighRisk { '#' } else { '=' };
    println!(
        "[{}{}] {}%",
        fill.to_string().repeat(filled),
        " ".repeat(PROGRESS_WIDTH - filled),
        result.progress()
    );
    println!();
    println!("{}", DISCLAIMER);
}

fn run(args: Args) -> Result<ExitCode> {
    let config = AppConfig::new(args.model.clone())
        .with_sha256(args.sha256.clone())
        .with_threads(args.intra_threads, args.inter_threads);

    let start_time = Instant::now();
    info!("Loading model from {:?}", config.model_path);
    let loader = config.loader();
    let model = config.load_model(&loader)
        .with_context(|| format!("Cannot start without a model (looked at {:?})", config.model_path))?;
    info!("Model {:?} loaded in {:.2?}", model.path(), start_time.elapsed());

    let mut session = FormSession::new(InferenceHandler::new(model));
    session.fill(read_form(&args)?);

    match session.submit() {
        Ok(result) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                render(&result);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("The prediction could not be computed: {}", e);
            eprintln!("Check the input values and submit again.");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn main() -> ExitCode {
    cardiorisk::init_logger();
    let args = Args::parse();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
