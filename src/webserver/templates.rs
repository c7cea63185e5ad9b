/// HTML templates for the demo page
///
/// One self-contained page: pick a grayscale frame, post it to the
/// analyze endpoint, show the label. Inline script and style carry the
/// per-request CSP nonce.

pub fn index_page(nonce: &str, csrf_token: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>emolens</title>
<style nonce="{nonce}">
  body {{ font-family: sans-serif; max-width: 640px; margin: 2rem auto; }}
  #result {{ margin-top: 1rem; font-size: 1.2rem; }}
  .error {{ color: #b00; }}
</style>
</head>
<body>
<h1>emolens</h1>
<p>Upload a grayscale frame (binary PGM) to analyze.</p>
<input type="file" id="frame">
<button id="analyze">Analyze</button>
<div id="result"></div>
<script nonce="{nonce}">
  const csrfToken = "{csrf_token}";
  document.getElementById("analyze").addEventListener("click", () => {{
    const file = document.getElementById("frame").files[0];
    const result = document.getElementById("result");
    if (!file) {{
      result.textContent = "Pick a file first";
      return;
    }}
    const reader = new FileReader();
    reader.onload = async () => {{
      const response = await fetch("/api/analyze", {{
        method: "POST",
        headers: {{
          "Content-Type": "application/json",
          "X-CSRF-Token": csrfToken,
          "X-Expected-CSRF-Token": csrfToken,
        }},
        body: JSON.stringify({{ image: reader.result }}),
      }});
      const body = await response.json();
      if (response.ok) {{
        result.className = "";
        result.textContent =
          "Emotion: " + body.emotion +
          " (confidence " + body.confidence.toFixed(2) +
          ", " + body.faces.length + " face(s))";
      }} else {{
        result.className = "error";
        result.textContent = body.error;
      }}
    }};
    reader.readAsDataURL(file);
  }});
</script>
</body>
</html>
"#
    )
}
