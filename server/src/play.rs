//! Interactive terminal game against the strategy chain.

use chess::{parse_uci_move, DisplayBoard};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::session::{Rejection, ReplyStatus, SessionManager, SessionSnapshot};

const HELP: &str = "\
Enter moves in coordinate notation (e2e4, e7e8q, e1g1).
Commands:
  moves [square]  list legal moves
  fen             print the current position
  new             start a new game
  quit            leave
";

/// Drive one session from line-based input until `quit` or end of input.
pub async fn run<R, W>(manager: &SessionManager, input: R, mut out: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut snapshot = manager.create_session().await;
    let id = snapshot.session_id.clone();

    write_board(&mut out, &snapshot).await?;
    out.write_all(HELP.as_bytes()).await?;

    loop {
        out.write_all(b"> ").await?;
        out.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        let mut words = line.split_whitespace();

        match words.next() {
            None => continue,
            Some("quit" | "exit") => break,
            Some("help") => out.write_all(HELP.as_bytes()).await?,
            Some("fen") => out.write_all(format!("{}\n", snapshot.fen).as_bytes()).await?,
            Some("new") => {
                snapshot = manager.reset(&id).await?;
                write_board(&mut out, &snapshot).await?;
            }
            Some("moves") => {
                let from = match words.next().map(chess::parse_square).transpose() {
                    Ok(from) => from,
                    Err(e) => {
                        out.write_all(format!("{}\n", e).as_bytes()).await?;
                        continue;
                    }
                };
                let moves: Vec<String> = manager
                    .legal_moves(&id, from)
                    .await?
                    .into_iter()
                    .map(|m| m.uci)
                    .collect();
                out.write_all(format!("{}\n", moves.join(" ")).as_bytes())
                    .await?;
            }
            Some(token) => {
                let mv = match parse_uci_move(token) {
                    Ok(mv) => mv,
                    Err(e) => {
                        out.write_all(format!("{}; type help for commands\n", e).as_bytes())
                            .await?;
                        continue;
                    }
                };

                let outcome = manager
                    .submit_move(&id, mv.from, mv.to, mv.promotion)
                    .await?;
                match outcome.rejection {
                    Some(Rejection::IllegalMove) => {
                        out.write_all(b"Illegal move.\n").await?;
                        continue;
                    }
                    Some(Rejection::GameOver) => {
                        out.write_all(b"The game is over; type new to play again.\n")
                            .await?;
                        continue;
                    }
                    None => {}
                }

                match &outcome.reply {
                    ReplyStatus::Played { mv, resolver } => {
                        out.write_all(format!("Computer plays {} ({})\n", mv, resolver).as_bytes())
                            .await?;
                    }
                    ReplyStatus::Unavailable => {
                        out.write_all(
                            b"No reply move available this turn; you may move for the other side.\n",
                        )
                        .await?;
                    }
                    ReplyStatus::NotAttempted => {}
                }

                snapshot = outcome.snapshot;
                write_board(&mut out, &snapshot).await?;

                if snapshot.status.is_terminal() {
                    out.write_all(b"Play again? [y/n] ").await?;
                    out.flush().await?;
                    let again = lines.next_line().await?.unwrap_or_default();
                    if !again.trim().eq_ignore_ascii_case("y") {
                        break;
                    }
                    snapshot = manager.reset(&id).await?;
                    write_board(&mut out, &snapshot).await?;
                }
            }
        }
    }

    manager.close_session(&id).await?;
    out.flush().await?;
    Ok(())
}

async fn write_board<W: AsyncWrite + Unpin>(
    out: &mut W,
    snapshot: &SessionSnapshot,
) -> anyhow::Result<()> {
    let board = DisplayBoard::from_fen(&snapshot.fen)?;
    let status = if snapshot.status.is_terminal() {
        snapshot.status.to_string()
    } else {
        format!("{} to move", snapshot.side_to_move)
    };
    out.write_all(format!("\n{}\n{}\n", board.render(), status).as_bytes())
        .await?;
    Ok(())
}
