/// The chat page. User halves arrive already rendered as HTML; bot halves are
/// shown as plain text.
const TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>TryLLM</title>
<style>
  body { font-family: sans-serif; max-width: 960px; margin: 0 auto; padding: 1em; }
  #chat { border: 1px solid #ddd; border-radius: 6px; min-height: 320px; padding: 0.5em; overflow-y: auto; }
  .user, .bot { margin: 0.5em 0; padding: 0.5em 0.75em; border-radius: 6px; }
  .user { background: #eef4ff; margin-left: 20%; }
  .bot { background: #f4f4f4; margin-right: 20%; white-space: pre-wrap; }
  #controls { display: flex; gap: 0.5em; margin-top: 1em; }
  #input { flex: 1; }
  #error { color: #b00020; }
</style>
</head>
<body>
<h1 align="center">{{HEADING}}</h1>
<div id="chat"></div>
<div id="controls">
  <textarea id="input" rows="10" placeholder="Input..."></textarea>
  <div>
    <button id="submit">Submit</button>
    <button id="clear">Clear History</button>
  </div>
</div>
<p id="error"></p>
<script>
let session = null;
const chat = document.getElementById("chat");
const input = document.getElementById("input");
const error = document.getElementById("error");

function show(turns) {
  chat.innerHTML = "";
  for (const turn of turns) {
    const user = document.createElement("div");
    user.className = "user";
    user.innerHTML = turn.user;
    const bot = document.createElement("div");
    bot.className = "bot";
    bot.textContent = turn.bot;
    chat.append(user, bot);
  }
  chat.scrollTop = chat.scrollHeight;
}

async function call(path, body) {
  const options = { method: "POST" };
  if (body !== undefined) {
    options.headers = { "content-type": "application/json" };
    options.body = JSON.stringify(body);
  }
  const response = await fetch(path, options);
  const data = await response.json();
  if (!response.ok) {
    throw new Error(data.error);
  }
  return data;
}

async function start() {
  session = (await call("/api/session")).session;
}

document.getElementById("submit").addEventListener("click", async () => {
  const text = input.value;
  input.value = "";
  error.textContent = "";
  try {
    show((await call(`/api/session/${session}/submit`, { input: text })).turns);
  } catch (e) {
    error.textContent = e.message;
  }
});

document.getElementById("clear").addEventListener("click", async () => {
  error.textContent = "";
  show((await call(`/api/session/${session}/clear`)).turns);
});

window.addEventListener("pagehide", () => {
  if (session !== null) {
    fetch(`/api/session/${session}`, { method: "DELETE", keepalive: true });
  }
});

start();
</script>
</body>
</html>
"#;

pub fn render(heading: &str) -> String {
    TEMPLATE.replace("{{HEADING}}", heading)
}
