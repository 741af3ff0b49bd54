use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt};
use modl::{EvaluationContext, Value};

async fn query(stdout: &mut io::Stdout, lines: &mut io::Lines<io::BufReader<io::Stdin>>) -> io::Result<Option<String>> {
    stdout.write_all("> ".as_bytes()).await?;
    stdout.flush().await?;
    lines.next_line().await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Stdin belongs to the prompt, so `read!` sees an empty input here
    let mut context = EvaluationContext::new()
        .with_io(std::io::empty(), std::io::stdout())
        .with_prelude()?;
    let mut lines = io::BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    // Every line is a complete chunk of statements; a failing one leaves
    // the bindings of earlier lines in place
    while let Some(line) = query(&mut stdout, &mut lines).await? {
        match context.evaluate_str(&line) {
            Ok(Value::Nothing) => {}
            Ok(value) => println!("{}", value),
            Err(err) => println!("Error: {}", err),
        }
    }

    Ok(())
}
