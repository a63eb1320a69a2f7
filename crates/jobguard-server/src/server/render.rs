//! HTML pages for browser clients

use jobguard_core::{PredictionLabel, PredictionResult};
use std::sync::OnceLock;
use tera::{Context, Tera};

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Job Fraud Detection</title>
    <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gray-100 min-h-screen flex items-center justify-center">
    <div class="bg-white p-8 rounded-lg shadow-lg max-w-2xl w-full">
        <h2 class="text-2xl font-bold text-gray-800 mb-6 text-center">Job Fraud Detection</h2>
        <form action="/predict" method="post" class="space-y-4">
            <textarea name="text" rows="5" class="w-full p-3 border rounded-lg focus:outline-none focus:ring-2 focus:ring-blue-500" placeholder="Nhập văn bản tuyển dụng..."></textarea>
            <button type="submit" class="w-full bg-blue-600 text-white py-2 rounded-lg hover:bg-blue-700 transition duration-200">Dự đoán</button>
        </form>
    </div>
</body>
</html>
"#;

pub fn index_page() -> &'static str {
    INDEX_PAGE
}

/// `.html` names turn on Tera's autoescaping
const RESULT_TEMPLATE: &str = "result.html";

const RESULT_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Job Fraud Detection Result</title>
    <script src="https://cdn.tailwindcss.com"></script>
</head>
<body class="bg-gray-100 min-h-screen flex items-center justify-center">
    <div class="bg-white p-8 rounded-lg shadow-lg max-w-2xl w-full">
        <h2 class="text-2xl font-bold text-gray-800 mb-6 text-center">Kết quả dự đoán</h2>
        <div class="space-y-4">
            <p><span class="font-semibold">Văn bản:</span> {{ text }}</p>
            <p><span class="font-semibold">Kết quả:</span> <span class="{{ label_class }}">{{ label }}</span></p>
            <p><span class="font-semibold">Xác suất:</span> Real = {{ real }}, Fraudulent = {{ fraudulent }}</p>
            <a href="/" class="inline-block bg-blue-600 text-white py-2 px-4 rounded-lg hover:bg-blue-700 transition duration-200">Thử lại</a>
        </div>
    </div>
</body>
</html>
"#;

fn templates() -> tera::Result<&'static Tera> {
    static TEMPLATES: OnceLock<Tera> = OnceLock::new();

    if let Some(tera) = TEMPLATES.get() {
        return Ok(tera);
    }
    let mut tera = Tera::default();
    tera.add_raw_template(RESULT_TEMPLATE, RESULT_PAGE)?;
    Ok(TEMPLATES.get_or_init(|| tera))
}

/// Result page for a form submission
pub fn result_page(result: &PredictionResult) -> tera::Result<String> {
    let label_class = match result.prediction() {
        PredictionLabel::Fraudulent => "text-red-600",
        PredictionLabel::Real => "text-green-600",
    };
    let probabilities = result.probabilities();

    let mut context = Context::new();
    context.insert("text", result.text());
    context.insert("label_class", label_class);
    context.insert("label", result.prediction().as_str());
    context.insert("real", &format!("{:.4}", probabilities.real));
    context.insert("fraudulent", &format!("{:.4}", probabilities.fraudulent));

    templates()?.render(RESULT_TEMPLATE, &context)
}
