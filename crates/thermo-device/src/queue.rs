use metrics::counter;
use std::path::{Path, PathBuf};
use thermo_core::Result;
use thermo_types::Reading;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// 持久化重试队列
///
/// 每行一个 JSON 对象（未签名的 `Reading`），追加写入；
/// 部分条目发送成功后整体重写（临时文件 + rename）。
/// 超过容量时丢弃最旧的条目。
#[derive(Debug)]
pub struct RetryQueue {
    path: PathBuf,
    capacity: usize,
    len: usize,
    /// 已知完整条目占用的字节数，文件超出部分视为写了一半的残行
    size: u64,
}

impl RetryQueue {
    /// 打开队列文件，不存在时创建
    ///
    /// 无法解析的行（崩溃时写了一半）会被记录并丢弃。
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut queue = Self {
            path,
            capacity: capacity.max(1),
            len: 0,
            size: 0,
        };

        let raw = match fs::read_to_string(&queue.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let (entries, torn) = parse_lines(&raw);
        let unterminated = !raw.is_empty() && !raw.ends_with('\n');

        if torn > 0 || unterminated || entries.len() > queue.capacity {
            let start = entries.len().saturating_sub(queue.capacity);
            if start > 0 {
                record_dropped(start);
            }
            queue.rewrite(&entries[start..]).await?;
        } else {
            queue.len = entries.len();
            queue.size = raw.len() as u64;
        }

        info!(
            path = %queue.path.display(),
            pending = queue.len,
            "Retry queue opened"
        );
        Ok(queue)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 按 FIFO 顺序读取全部条目
    pub async fn load(&self) -> Result<Vec<Reading>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(parse_lines(&raw).0)
    }

    /// 追加一条；队列已满时先丢弃最旧的条目
    ///
    /// 返回被丢弃的条目数。
    pub async fn push(&mut self, reading: &Reading) -> Result<usize> {
        if self.len >= self.capacity {
            let mut entries = self.load().await?;
            let dropped = (entries.len() + 1)
                .saturating_sub(self.capacity)
                .min(entries.len());
            entries.drain(..dropped);
            entries.push(reading.clone());
            self.rewrite(&entries).await?;

            warn!(
                dropped,
                capacity = self.capacity,
                "Retry queue full, oldest readings dropped"
            );
            record_dropped(dropped);
            return Ok(dropped);
        }

        let mut line = serde_json::to_vec(reading)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let on_disk = file.metadata().await?.len();
        if on_disk > self.size {
            warn!(
                expected = self.size,
                actual = on_disk,
                "Truncating partial entry at end of retry queue"
            );
            file.set_len(self.size).await?;
        }

        // 整行一次写入；失败时截回写入前的长度
        if let Err(e) = write_line(&mut file, &line).await {
            if let Err(truncate_err) = file.set_len(self.size).await {
                warn!("Failed to truncate retry queue after write error: {}", truncate_err);
            }
            return Err(e.into());
        }

        self.size += line.len() as u64;
        self.len += 1;
        debug!(pending = self.len, "Reading queued");
        Ok(0)
    }

    /// 用 `entries` 整体替换队列内容
    pub async fn rewrite(&mut self, entries: &[Reading]) -> Result<()> {
        let mut content = Vec::new();
        for entry in entries {
            serde_json::to_writer(&mut content, entry)?;
            content.push(b'\n');
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&content).await?;
            file.sync_all().await?;
        }
        // 原子性重命名
        fs::rename(&temp_path, &self.path).await?;

        self.len = entries.len();
        self.size = content.len() as u64;
        Ok(())
    }
}

async fn write_line(file: &mut fs::File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line).await?;
    file.sync_data().await
}

fn parse_lines(raw: &str) -> (Vec<Reading>, usize) {
    let mut entries = Vec::new();
    let mut torn = 0;

    for (idx, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Reading>(line) {
            Ok(reading) => entries.push(reading),
            Err(e) => {
                torn += 1;
                warn!(line = idx + 1, "Discarding unreadable queue entry: {}", e);
            }
        }
    }

    (entries, torn)
}

fn record_dropped(n: usize) {
    counter!("thermo_queue_dropped_total", n as u64);
}
