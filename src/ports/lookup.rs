/// 外部サービスへの問い合わせ結果
///
/// 「存在しない」と「問い合わせできなかった」を区別する。
/// 呼び出し側はプレースホルダーで握りつぶさず、どちらかを明示的に扱う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// 見つかった
    Found(T),
    /// 相手側で存在しないと回答された
    Missing,
    /// 通信失敗・タイムアウト・想定外のステータス
    Unavailable(String),
}

impl<T> Lookup<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Found(value) => Lookup::Found(f(value)),
            Lookup::Missing => Lookup::Missing,
            Lookup::Unavailable(reason) => Lookup::Unavailable(reason),
        }
    }

    pub fn found(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    /// ログやレスポンス用の短い表現
    pub fn outcome(&self) -> &'static str {
        match self {
            Lookup::Found(_) => "found",
            Lookup::Missing => "missing",
            Lookup::Unavailable(_) => "unavailable",
        }
    }
}
